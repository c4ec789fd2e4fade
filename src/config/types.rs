//! Version-neutral configuration types.
//!
//! Every supported schema version decodes into these types before
//! validation runs, so the validation pipeline stays version-agnostic
//! except for the single apiVersion-gated check on `tokenAttributes`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// The merged top-level configuration unit.
///
/// Provider order is preserved across documents: when multiple files are
/// loaded from a directory, their provider lists are concatenated in
/// file-processing order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialProviderConfig {
    pub providers: Vec<CredentialProvider>,
}

/// One configured external credential source.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialProvider {
    /// Provider name; also the basename of the helper executable, so it
    /// must be usable as a single path component.
    pub name: String,

    /// Image-reference patterns this provider is consulted for.
    pub match_images: Vec<String>,

    /// How long credentials returned by this provider may be cached when
    /// the provider response does not say otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_cache_duration: Option<CacheDuration>,

    /// Wire-protocol version the helper speaks.
    pub api_version: String,

    /// Extra arguments passed to the helper invocation.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// Extra environment passed to the helper invocation.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,

    /// Request a short-lived service account token for the helper.
    /// Only meaningful on the newest wire-protocol version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_attributes: Option<TokenAttributes>,
}

/// One environment variable for the helper process.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

/// Service account token attributes for a provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAttributes {
    /// Audience the minted token is scoped to.
    pub service_account_token_audience: String,

    /// Whether a service account is required to be present. Kept as an
    /// Option so the validator can distinguish "absent" from "false".
    pub require_service_account: Option<bool>,

    /// Annotation keys that must be present on the service account.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required_service_account_annotation_keys: Vec<String>,

    /// Annotation keys passed along when present.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub optional_service_account_annotation_keys: Vec<String>,
}

/// A cache duration parsed from a humantime string such as `10m`.
///
/// Signed: `-1m` decodes successfully; rejecting negative values with a
/// field-path error is the validator's job, not the decoder's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheDuration {
    negative: bool,
    duration: Duration,
}

impl CacheDuration {
    /// A non-negative duration.
    pub fn from_std(duration: Duration) -> Self {
        Self {
            negative: false,
            duration,
        }
    }

    /// True for values strictly below zero. `-0s` is not negative.
    pub fn is_negative(&self) -> bool {
        self.negative && !self.duration.is_zero()
    }

    /// The magnitude as a std duration.
    pub fn magnitude(&self) -> Duration {
        self.duration
    }

    /// The duration usable for caching, or `None` when negative.
    pub fn as_std(&self) -> Option<Duration> {
        if self.is_negative() { None } else { Some(self.duration) }
    }
}

impl FromStr for CacheDuration {
    type Err = humantime::DurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (negative, rest) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let duration = humantime::parse_duration(rest)?;
        Ok(Self { negative, duration })
    }
}

impl fmt::Display for CacheDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_negative() {
            write!(f, "-")?;
        }
        write!(f, "{}", humantime::format_duration(self.duration))
    }
}

impl Serialize for CacheDuration {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for CacheDuration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;
        let s = String::deserialize(deserializer)?;
        s.parse()
            .map_err(|e| D::Error::custom(format!("invalid duration {:?}: {}", s, e)))
    }
}
