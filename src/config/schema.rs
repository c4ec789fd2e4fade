//! Versioned document schemas and the strict decoder.
//!
//! Each supported schema version is modeled as its own set of types and
//! decoded independently, then normalized into the version-neutral shape
//! in [`super::types`]. Decoding is strict: before deserializing, the
//! document's field set is diffed against the schema's known fields and
//! any unknown field fails the load with its full path
//! (`providers[0].unknownField`). Unknown `kind`/`apiVersion` pairs are a
//! distinct error so operators can tell a typo'd schema from a typo'd
//! field.

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use super::types;
use super::types::CacheDuration;

/// Fixed `kind` literal shared by every schema version.
pub const CONFIG_KIND: &str = "CredentialProviderConfig";

/// Wire-protocol versions a provider helper may declare, oldest first.
pub const PROVIDER_API_V1ALPHA1: &str = "credentialprovider.pullcreds.dev/v1alpha1";
pub const PROVIDER_API_V1BETA1: &str = "credentialprovider.pullcreds.dev/v1beta1";
pub const PROVIDER_API_V1: &str = "credentialprovider.pullcreds.dev/v1";

/// Supported provider wire-protocol versions, sorted for error output.
pub const SUPPORTED_PROVIDER_API_VERSIONS: [&str; 3] = [
    PROVIDER_API_V1,
    PROVIDER_API_V1ALPHA1,
    PROVIDER_API_V1BETA1,
];

/// Supported envelope schema versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaVersion {
    V1Alpha1,
    V1Beta1,
    V1,
}

impl SchemaVersion {
    /// Every supported version, oldest first.
    pub const ALL: [SchemaVersion; 3] = [
        SchemaVersion::V1Alpha1,
        SchemaVersion::V1Beta1,
        SchemaVersion::V1,
    ];

    /// The envelope `apiVersion` string for this schema version.
    pub fn api_version(self) -> &'static str {
        match self {
            SchemaVersion::V1Alpha1 => "pullcreds.dev/v1alpha1",
            SchemaVersion::V1Beta1 => "pullcreds.dev/v1beta1",
            SchemaVersion::V1 => "pullcreds.dev/v1",
        }
    }

    /// Resolve a (`kind`, `apiVersion`) pair to a schema version.
    pub fn lookup(kind: &str, api_version: &str) -> Option<SchemaVersion> {
        if kind != CONFIG_KIND {
            return None;
        }
        SchemaVersion::ALL
            .into_iter()
            .find(|v| v.api_version() == api_version)
    }

    /// Known provider-entry fields for this schema version.
    /// `tokenAttributes` exists only in the newest schema.
    fn provider_fields(self) -> &'static [&'static str] {
        match self {
            SchemaVersion::V1Alpha1 | SchemaVersion::V1Beta1 => PROVIDER_FIELDS,
            SchemaVersion::V1 => PROVIDER_FIELDS_V1,
        }
    }
}

/// Decoding failure for a single document.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("document is not a mapping")]
    NotAMapping,

    #[error("document has no \"kind\" field")]
    MissingKind,

    #[error("document has no \"apiVersion\" field")]
    MissingApiVersion,

    #[error("no kind {kind:?} is registered for version {api_version:?}")]
    UnknownSchema { kind: String, api_version: String },

    #[error("strict decoding error: unknown field {field:?}")]
    UnknownField { field: String },

    #[error("strict decoding error: {0}")]
    Invalid(String),
}

const DOCUMENT_FIELDS: &[&str] = &["kind", "apiVersion", "providers"];
const PROVIDER_FIELDS: &[&str] = &[
    "name",
    "matchImages",
    "defaultCacheDuration",
    "apiVersion",
    "args",
    "env",
];
const PROVIDER_FIELDS_V1: &[&str] = &[
    "name",
    "matchImages",
    "defaultCacheDuration",
    "apiVersion",
    "args",
    "env",
    "tokenAttributes",
];
const ENV_FIELDS: &[&str] = &["name", "value"];
const TOKEN_ATTRIBUTE_FIELDS: &[&str] = &[
    "serviceAccountTokenAudience",
    "requireServiceAccount",
    "requiredServiceAccountAnnotationKeys",
    "optionalServiceAccountAnnotationKeys",
];

/// Decode one parsed document into the version-neutral configuration.
///
/// Dispatches on the declared `kind`/`apiVersion`, runs the strict
/// unknown-field pass for that schema version, then deserializes and
/// normalizes. Missing provider fields decode to empty values; the
/// validator, not the decoder, reports them.
pub fn decode_document(doc: &Value) -> Result<types::CredentialProviderConfig, DecodeError> {
    let obj = doc.as_object().ok_or(DecodeError::NotAMapping)?;
    let kind = obj
        .get("kind")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingKind)?;
    let api_version = obj
        .get("apiVersion")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingApiVersion)?;

    let version =
        SchemaVersion::lookup(kind, api_version).ok_or_else(|| DecodeError::UnknownSchema {
            kind: kind.to_string(),
            api_version: api_version.to_string(),
        })?;

    check_document_fields(obj, version)?;

    let config = match version {
        SchemaVersion::V1Alpha1 => {
            from_value::<v1alpha1::CredentialProviderConfig>(doc)?.into()
        }
        SchemaVersion::V1Beta1 => from_value::<v1beta1::CredentialProviderConfig>(doc)?.into(),
        SchemaVersion::V1 => from_value::<v1::CredentialProviderConfig>(doc)?.into(),
    };
    Ok(config)
}

fn from_value<T: serde::de::DeserializeOwned>(doc: &Value) -> Result<T, DecodeError> {
    serde_json::from_value(doc.clone()).map_err(|e| DecodeError::Invalid(e.to_string()))
}

/// The explicit strict-decoding pass: walk the raw document and fail on
/// the first field not known to the declared schema version.
fn check_document_fields(obj: &Map<String, Value>, version: SchemaVersion) -> Result<(), DecodeError> {
    check_known(obj, DOCUMENT_FIELDS, "")?;

    let Some(providers) = obj.get("providers").and_then(Value::as_array) else {
        return Ok(());
    };
    for (i, provider) in providers.iter().enumerate() {
        // Non-mapping entries surface as deserialization errors later.
        let Some(provider) = provider.as_object() else {
            continue;
        };
        let path = format!("providers[{}]", i);
        check_known(provider, version.provider_fields(), &path)?;

        if let Some(env) = provider.get("env").and_then(Value::as_array) {
            for (j, entry) in env.iter().enumerate() {
                if let Some(entry) = entry.as_object() {
                    check_known(entry, ENV_FIELDS, &format!("{}.env[{}]", path, j))?;
                }
            }
        }

        if version == SchemaVersion::V1
            && let Some(attrs) = provider.get("tokenAttributes").and_then(Value::as_object)
        {
            check_known(
                attrs,
                TOKEN_ATTRIBUTE_FIELDS,
                &format!("{}.tokenAttributes", path),
            )?;
        }
    }
    Ok(())
}

fn check_known(obj: &Map<String, Value>, known: &[&str], path: &str) -> Result<(), DecodeError> {
    for key in obj.keys() {
        if !known.contains(&key.as_str()) {
            let field = if path.is_empty() {
                key.clone()
            } else {
                format!("{}.{}", path, key)
            };
            return Err(DecodeError::UnknownField { field });
        }
    }
    Ok(())
}

/// Oldest schema version. No `tokenAttributes` support.
pub mod v1alpha1 {
    use super::*;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CredentialProviderConfig {
        pub kind: String,
        pub api_version: String,
        #[serde(default)]
        pub providers: Vec<CredentialProvider>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CredentialProvider {
        #[serde(default)]
        pub name: String,
        #[serde(default)]
        pub match_images: Vec<String>,
        #[serde(default)]
        pub default_cache_duration: Option<CacheDuration>,
        #[serde(default)]
        pub api_version: String,
        #[serde(default)]
        pub args: Vec<String>,
        #[serde(default)]
        pub env: Vec<EnvVar>,
    }

    #[derive(Debug, Default, Deserialize)]
    pub struct EnvVar {
        #[serde(default)]
        pub name: String,
        #[serde(default)]
        pub value: String,
    }

    impl From<CredentialProviderConfig> for types::CredentialProviderConfig {
        fn from(config: CredentialProviderConfig) -> Self {
            Self {
                providers: config.providers.into_iter().map(Into::into).collect(),
            }
        }
    }

    impl From<CredentialProvider> for types::CredentialProvider {
        fn from(provider: CredentialProvider) -> Self {
            Self {
                name: provider.name,
                match_images: provider.match_images,
                default_cache_duration: provider.default_cache_duration,
                api_version: provider.api_version,
                args: provider.args,
                env: provider.env.into_iter().map(Into::into).collect(),
                token_attributes: None,
            }
        }
    }

    impl From<EnvVar> for types::EnvVar {
        fn from(env: EnvVar) -> Self {
            Self {
                name: env.name,
                value: env.value,
            }
        }
    }
}

/// Intermediate schema version. Structurally identical to v1alpha1.
pub mod v1beta1 {
    use super::*;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CredentialProviderConfig {
        pub kind: String,
        pub api_version: String,
        #[serde(default)]
        pub providers: Vec<CredentialProvider>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CredentialProvider {
        #[serde(default)]
        pub name: String,
        #[serde(default)]
        pub match_images: Vec<String>,
        #[serde(default)]
        pub default_cache_duration: Option<CacheDuration>,
        #[serde(default)]
        pub api_version: String,
        #[serde(default)]
        pub args: Vec<String>,
        #[serde(default)]
        pub env: Vec<EnvVar>,
    }

    #[derive(Debug, Default, Deserialize)]
    pub struct EnvVar {
        #[serde(default)]
        pub name: String,
        #[serde(default)]
        pub value: String,
    }

    impl From<CredentialProviderConfig> for types::CredentialProviderConfig {
        fn from(config: CredentialProviderConfig) -> Self {
            Self {
                providers: config.providers.into_iter().map(Into::into).collect(),
            }
        }
    }

    impl From<CredentialProvider> for types::CredentialProvider {
        fn from(provider: CredentialProvider) -> Self {
            Self {
                name: provider.name,
                match_images: provider.match_images,
                default_cache_duration: provider.default_cache_duration,
                api_version: provider.api_version,
                args: provider.args,
                env: provider.env.into_iter().map(Into::into).collect(),
                token_attributes: None,
            }
        }
    }

    impl From<EnvVar> for types::EnvVar {
        fn from(env: EnvVar) -> Self {
            Self {
                name: env.name,
                value: env.value,
            }
        }
    }
}

/// Newest schema version; the only one carrying `tokenAttributes`.
pub mod v1 {
    use super::*;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CredentialProviderConfig {
        pub kind: String,
        pub api_version: String,
        #[serde(default)]
        pub providers: Vec<CredentialProvider>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CredentialProvider {
        #[serde(default)]
        pub name: String,
        #[serde(default)]
        pub match_images: Vec<String>,
        #[serde(default)]
        pub default_cache_duration: Option<CacheDuration>,
        #[serde(default)]
        pub api_version: String,
        #[serde(default)]
        pub args: Vec<String>,
        #[serde(default)]
        pub env: Vec<EnvVar>,
        #[serde(default)]
        pub token_attributes: Option<TokenAttributes>,
    }

    #[derive(Debug, Default, Deserialize)]
    pub struct EnvVar {
        #[serde(default)]
        pub name: String,
        #[serde(default)]
        pub value: String,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct TokenAttributes {
        #[serde(default)]
        pub service_account_token_audience: String,
        #[serde(default)]
        pub require_service_account: Option<bool>,
        #[serde(default)]
        pub required_service_account_annotation_keys: Vec<String>,
        #[serde(default)]
        pub optional_service_account_annotation_keys: Vec<String>,
    }

    impl From<CredentialProviderConfig> for types::CredentialProviderConfig {
        fn from(config: CredentialProviderConfig) -> Self {
            Self {
                providers: config.providers.into_iter().map(Into::into).collect(),
            }
        }
    }

    impl From<CredentialProvider> for types::CredentialProvider {
        fn from(provider: CredentialProvider) -> Self {
            Self {
                name: provider.name,
                match_images: provider.match_images,
                default_cache_duration: provider.default_cache_duration,
                api_version: provider.api_version,
                args: provider.args,
                env: provider.env.into_iter().map(Into::into).collect(),
                token_attributes: provider.token_attributes.map(Into::into),
            }
        }
    }

    impl From<EnvVar> for types::EnvVar {
        fn from(env: EnvVar) -> Self {
            Self {
                name: env.name,
                value: env.value,
            }
        }
    }

    impl From<TokenAttributes> for types::TokenAttributes {
        fn from(attrs: TokenAttributes) -> Self {
            Self {
                service_account_token_audience: attrs.service_account_token_audience,
                require_service_account: attrs.require_service_account,
                required_service_account_annotation_keys: attrs
                    .required_service_account_annotation_keys,
                optional_service_account_annotation_keys: attrs
                    .optional_service_account_annotation_keys,
            }
        }
    }
}
