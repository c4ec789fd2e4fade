//! Structural validation of the merged configuration.
//!
//! Validation is a pure pass over the whole configuration: it collects
//! every applicable violation across all providers into one aggregate
//! instead of stopping at the first, so operators can fix everything in
//! a single edit/reload cycle. The input is never modified.

use regex_lite::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

use super::schema::{PROVIDER_API_V1, SUPPORTED_PROVIDER_API_VERSIONS};
use super::types::{CredentialProvider, CredentialProviderConfig, TokenAttributes};
use crate::error::{FieldError, ValidationErrors, ViolationKind};

/// Host feature gates that influence validation.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureGates {
    /// Whether the host may mint service account tokens for providers.
    /// When disabled, `tokenAttributes` is rejected outright.
    pub service_account_tokens: bool,
}

static NAME_PART_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z0-9][-A-Za-z0-9_.]*)?[A-Za-z0-9]$").unwrap());
static PREFIX_PART_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$").unwrap()
});

const MAX_NAME_PART_LEN: usize = 63;
const MAX_PREFIX_PART_LEN: usize = 253;

/// Validate a merged configuration against every structural rule.
///
/// Returns `Ok(())` or the complete, deterministically ordered list of
/// violations: per-provider checks in provider order, then the
/// cross-provider duplicate-name pass last.
///
/// # Errors
///
/// Returns [`ValidationErrors`] carrying one [`FieldError`] per failed
/// rule.
pub fn validate_config(
    config: &CredentialProviderConfig,
    features: &FeatureGates,
) -> Result<(), ValidationErrors> {
    let mut errors = Vec::new();

    if config.providers.is_empty() {
        errors.push(FieldError::required(
            "providers",
            "at least 1 provider is required",
        ));
    }

    for (i, provider) in config.providers.iter().enumerate() {
        validate_provider(&format!("providers[{}]", i), provider, features, &mut errors);
    }

    // Duplicate names can only be judged across the whole merged list, so
    // this pass runs after all per-provider checks. Each duplicated name
    // is reported once, at its first repeated position.
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    for (i, provider) in config.providers.iter().enumerate() {
        if !seen.insert(provider.name.as_str()) && reported.insert(provider.name.as_str()) {
            errors.push(FieldError::duplicate(
                format!("providers[{}].name", i),
                &provider.name,
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors { errors })
    }
}

fn validate_provider(
    path: &str,
    provider: &CredentialProvider,
    features: &FeatureGates,
    errors: &mut Vec<FieldError>,
) {
    if provider.match_images.is_empty() {
        errors.push(FieldError::required(
            format!("{}.matchImages", path),
            "at least 1 item in matchImages is required",
        ));
    }
    for pattern in &provider.match_images {
        if let Err(reason) = validate_match_image(pattern) {
            errors.push(FieldError::invalid(
                format!("{}.matchImages", path),
                pattern,
                &reason,
            ));
        }
    }

    match provider.default_cache_duration {
        None => errors.push(FieldError::required(
            format!("{}.defaultCacheDuration", path),
            "defaultCacheDuration is required",
        )),
        Some(duration) if duration.is_negative() => errors.push(FieldError::invalid(
            format!("{}.defaultCacheDuration", path),
            &duration.to_string(),
            "must be greater than or equal to 0",
        )),
        Some(_) => {}
    }

    if provider.api_version.is_empty() {
        errors.push(FieldError::required(
            format!("{}.apiVersion", path),
            "apiVersion is required",
        ));
    } else if !SUPPORTED_PROVIDER_API_VERSIONS.contains(&provider.api_version.as_str()) {
        errors.push(FieldError::unsupported(
            format!("{}.apiVersion", path),
            &provider.api_version,
            &SUPPORTED_PROVIDER_API_VERSIONS,
        ));
    }

    validate_name(path, &provider.name, errors);

    if let Some(attrs) = &provider.token_attributes {
        validate_token_attributes(path, provider, attrs, features, errors);
    }
}

/// Name rules. The name later becomes the basename of the helper
/// executable, so anything that could escape a single path component is
/// rejected, each shape violation with its own message.
fn validate_name(path: &str, name: &str, errors: &mut Vec<FieldError>) {
    let field = format!("{}.name", path);
    if name.is_empty() {
        errors.push(FieldError::required(field, "name is required"));
        return;
    }
    if name.contains('/') {
        errors.push(FieldError::invalid(
            field.as_str(),
            name,
            "provider name cannot contain '/'",
        ));
    }
    if name == "." {
        errors.push(FieldError::invalid(
            field.as_str(),
            name,
            "provider name cannot be '.'",
        ));
    }
    if name == ".." {
        errors.push(FieldError::invalid(
            field.as_str(),
            name,
            "provider name cannot be '..'",
        ));
    }
    if name.contains(' ') {
        errors.push(FieldError::invalid(
            field.as_str(),
            name,
            "provider name cannot contain spaces",
        ));
    }
}

/// A match pattern must at least be URL-shaped; parse failures carry the
/// lexical cause from the URL parser.
fn validate_match_image(pattern: &str) -> Result<(), String> {
    match Url::parse(&format!("https://{}", pattern)) {
        Ok(_) => Ok(()),
        Err(e) => Err(format!("match image is invalid: {}", e)),
    }
}

fn validate_token_attributes(
    path: &str,
    provider: &CredentialProvider,
    attrs: &TokenAttributes,
    features: &FeatureGates,
    errors: &mut Vec<FieldError>,
) {
    let field = format!("{}.tokenAttributes", path);

    if !features.service_account_tokens {
        errors.push(FieldError::forbidden(
            field,
            "tokenAttributes is not supported when the ServiceAccountTokensForProviders \
             feature gate is disabled",
        ));
        return;
    }
    if provider.api_version != PROVIDER_API_V1 {
        errors.push(FieldError::forbidden(
            field,
            &format!(
                "tokenAttributes is only supported for {} API version",
                PROVIDER_API_V1
            ),
        ));
        return;
    }

    if attrs.service_account_token_audience.is_empty() {
        errors.push(FieldError::required(
            format!("{}.serviceAccountTokenAudience", field),
            "serviceAccountTokenAudience is required",
        ));
    }

    match attrs.require_service_account {
        None => errors.push(FieldError::required(
            format!("{}.requireServiceAccount", field),
            "requireServiceAccount is required",
        )),
        Some(false) if !attrs.required_service_account_annotation_keys.is_empty() => {
            errors.push(FieldError::forbidden(
                format!("{}.requiredServiceAccountAnnotationKeys", field),
                "requireServiceAccount cannot be false when \
                 requiredServiceAccountAnnotationKeys is set",
            ));
        }
        Some(_) => {}
    }

    validate_annotation_keys(
        &format!("{}.requiredServiceAccountAnnotationKeys", field),
        &attrs.required_service_account_annotation_keys,
        errors,
    );
    validate_annotation_keys(
        &format!("{}.optionalServiceAccountAnnotationKeys", field),
        &attrs.optional_service_account_annotation_keys,
        errors,
    );

    // The two sets must be disjoint; report the intersection once.
    let required: HashSet<&str> = attrs
        .required_service_account_annotation_keys
        .iter()
        .map(String::as_str)
        .collect();
    let mut overlap = Vec::new();
    let mut overlap_seen = HashSet::new();
    for key in &attrs.optional_service_account_annotation_keys {
        if required.contains(key.as_str()) && overlap_seen.insert(key.as_str()) {
            overlap.push(format!("{:?}", key));
        }
    }
    if !overlap.is_empty() {
        errors.push(FieldError::new(
            field,
            ViolationKind::Invalid,
            format!(
                "Invalid value: [{}]: annotation keys cannot be both required and optional",
                overlap.join(", ")
            ),
        ));
    }
}

/// Grammar and uniqueness for one annotation-key set.
fn validate_annotation_keys(field: &str, keys: &[String], errors: &mut Vec<FieldError>) {
    let mut seen = HashSet::new();
    for key in keys {
        if let Err(reason) = validate_qualified_name(key) {
            errors.push(FieldError::invalid(field, key, &reason));
        }
        if !seen.insert(key.as_str()) {
            errors.push(FieldError::duplicate(field, key));
        }
    }
}

/// Qualified-name grammar: optional `prefix/` (lowercase DNS subdomain)
/// plus an alphanumeric-bounded name part.
fn validate_qualified_name(key: &str) -> Result<(), String> {
    let mut parts = key.split('/');
    let (prefix, name) = match (parts.next(), parts.next(), parts.next()) {
        (Some(name), None, _) => (None, name),
        (Some(prefix), Some(name), None) => (Some(prefix), name),
        _ => return Err("a qualified name must have at most one '/'".to_string()),
    };

    if let Some(prefix) = prefix {
        if prefix.is_empty() {
            return Err("prefix part must be non-empty".to_string());
        }
        if prefix.len() > MAX_PREFIX_PART_LEN {
            return Err(format!(
                "prefix part must be no more than {} characters",
                MAX_PREFIX_PART_LEN
            ));
        }
        if !PREFIX_PART_RE.is_match(prefix) {
            return Err(
                "prefix part must be a lowercase DNS subdomain (e.g. 'example.com')".to_string(),
            );
        }
    }

    if name.is_empty() {
        return Err("name part must be non-empty".to_string());
    }
    if name.len() > MAX_NAME_PART_LEN {
        return Err(format!(
            "name part must be no more than {} characters",
            MAX_NAME_PART_LEN
        ));
    }
    if !NAME_PART_RE.is_match(name) {
        return Err("name part must consist of alphanumeric characters, '-', '_' or '.', \
                    and must start and end with an alphanumeric character \
                    (e.g. 'MyName', 'my.name', or '123-abc')"
            .to_string());
    }
    Ok(())
}
