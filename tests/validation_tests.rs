//! Integration tests for end-to-end load-then-validate flows.
//!
//! The loader deliberately performs no structural validation, so these
//! tests exercise the seam between the two components: configurations
//! that load fine but fail validation, the feature-gate matrix for
//! tokenAttributes, and aggregate error reporting across files.

use pullcreds::config::{FeatureGates, load_config, validate_config};
use pullcreds::error::{FieldError, ViolationKind};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_config(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

fn load_and_validate(path: &Path, features: &FeatureGates) -> Result<(), Vec<FieldError>> {
    let config = load_config(path).expect("load should succeed");
    validate_config(&config, features).map_err(|errs| errs.errors)
}

fn provider_doc(name: &str) -> String {
    format!(
        r#"---
kind: CredentialProviderConfig
apiVersion: pullcreds.dev/v1
providers:
  - name: {name}
    matchImages:
    - "foobar.registry.io"
    defaultCacheDuration: 1m
    apiVersion: credentialprovider.pullcreds.dev/v1
"#
    )
}

fn token_attributes_doc(provider_api: &str) -> String {
    format!(
        r#"---
kind: CredentialProviderConfig
apiVersion: pullcreds.dev/v1
providers:
  - name: foobar
    matchImages:
    - "foobar.registry.io"
    defaultCacheDuration: 1m
    apiVersion: {provider_api}
    tokenAttributes:
      serviceAccountTokenAudience: audience
      requireServiceAccount: true
      requiredServiceAccountAnnotationKeys:
      - now-with-dashes/simple
"#
    )
}

const GATED: FeatureGates = FeatureGates {
    service_account_tokens: true,
};

mod end_to_end_tests {
    use super::*;

    #[test]
    fn valid_config_passes_and_revalidates_cleanly() {
        let temp = TempDir::new().unwrap();
        write_config(temp.path(), "config.yaml", &provider_doc("foobar"));

        let config = load_config(temp.path()).unwrap();
        // Validation takes the configuration by reference and never
        // mutates it, so a second pass sees the same result.
        assert!(validate_config(&config, &FeatureGates::default()).is_ok());
        assert!(validate_config(&config, &FeatureGates::default()).is_ok());
    }

    #[test]
    fn duplicate_names_across_files_are_rejected() {
        // Each file is valid on its own; only the merged view has the
        // collision.
        let temp = TempDir::new().unwrap();
        write_config(
            temp.path(),
            "config-001.yaml",
            &provider_doc("duplicate").replace("foobar.registry.io", "registry.io/one"),
        );
        write_config(
            temp.path(),
            "config-002.yaml",
            &provider_doc("duplicate").replace("foobar.registry.io", "registry.io/two"),
        );

        let errs = load_and_validate(temp.path(), &FeatureGates::default()).unwrap_err();
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].field, "providers[1].name");
        assert_eq!(errs[0].kind, ViolationKind::Duplicate);
        assert!(errs[0].message.contains("\"duplicate\""));
    }

    #[test]
    fn negative_cache_duration_is_rejected_after_load() {
        let temp = TempDir::new().unwrap();
        write_config(
            temp.path(),
            "config.yaml",
            &provider_doc("foobar").replace("defaultCacheDuration: 1m", "defaultCacheDuration: -1m"),
        );

        let errs = load_and_validate(temp.path(), &FeatureGates::default()).unwrap_err();
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].field, "providers[0].defaultCacheDuration");
        assert!(errs[0].message.contains("greater than or equal to 0"));
    }

    #[test]
    fn invalid_match_image_is_rejected_after_load() {
        let temp = TempDir::new().unwrap();
        write_config(
            temp.path(),
            "config.yaml",
            &provider_doc("foobar").replace("foobar.registry.io", "%invalid%"),
        );

        let errs = load_and_validate(temp.path(), &FeatureGates::default()).unwrap_err();
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].field, "providers[0].matchImages");
        assert!(errs[0].message.contains("match image is invalid"));
    }

    #[test]
    fn all_errors_are_reported_in_one_pass() {
        let temp = TempDir::new().unwrap();
        write_config(
            temp.path(),
            "config-001.yaml",
            r#"---
kind: CredentialProviderConfig
apiVersion: pullcreds.dev/v1
providers:
  - name: foo bar
    matchImages: []
    apiVersion: bogus/v1
"#,
        );
        write_config(temp.path(), "config-002.yaml", &provider_doc("foo bar"));

        let errs = load_and_validate(temp.path(), &FeatureGates::default()).unwrap_err();
        let fields: Vec<_> = errs.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "providers[0].matchImages",
                "providers[0].defaultCacheDuration",
                "providers[0].apiVersion",
                "providers[0].name",
                "providers[1].name",
                "providers[1].name",
            ]
        );
        // The duplicate-name pass runs last.
        assert_eq!(errs[5].kind, ViolationKind::Duplicate);
    }
}

mod feature_gate_tests {
    use super::*;

    const NEWEST: &str = "credentialprovider.pullcreds.dev/v1";

    #[test]
    fn token_attributes_accepted_with_gate_enabled_and_newest_version() {
        let temp = TempDir::new().unwrap();
        write_config(temp.path(), "config.yaml", &token_attributes_doc(NEWEST));

        assert!(load_and_validate(temp.path(), &GATED).is_ok());
    }

    #[test]
    fn token_attributes_rejected_with_gate_disabled() {
        let temp = TempDir::new().unwrap();
        write_config(temp.path(), "config.yaml", &token_attributes_doc(NEWEST));

        let errs = load_and_validate(temp.path(), &FeatureGates::default()).unwrap_err();
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].kind, ViolationKind::Forbidden);
        assert!(errs[0].message.contains("feature gate is disabled"));
    }

    #[test]
    fn token_attributes_rejected_for_older_wire_versions() {
        for older in [
            "credentialprovider.pullcreds.dev/v1alpha1",
            "credentialprovider.pullcreds.dev/v1beta1",
        ] {
            let temp = TempDir::new().unwrap();
            write_config(temp.path(), "config.yaml", &token_attributes_doc(older));

            let errs = load_and_validate(temp.path(), &GATED).unwrap_err();
            assert_eq!(errs.len(), 1, "version {older}");
            assert_eq!(errs[0].kind, ViolationKind::Forbidden);
            assert!(
                errs[0]
                    .message
                    .contains("only supported for credentialprovider.pullcreds.dev/v1"),
                "version {older}: got {:?}",
                errs[0].message
            );
        }
    }

    #[test]
    fn token_attributes_rejected_for_older_version_even_with_gate_disabled() {
        // Both preconditions fail; the gate check is reported, and it
        // alone, so the message is unambiguous.
        let temp = TempDir::new().unwrap();
        write_config(
            temp.path(),
            "config.yaml",
            &token_attributes_doc("credentialprovider.pullcreds.dev/v1beta1"),
        );

        let errs = load_and_validate(temp.path(), &FeatureGates::default()).unwrap_err();
        assert_eq!(errs.len(), 1);
        assert!(errs[0].message.contains("feature gate is disabled"));
    }

    #[test]
    fn annotation_key_validation_applies_end_to_end() {
        let temp = TempDir::new().unwrap();
        write_config(
            temp.path(),
            "config.yaml",
            &token_attributes_doc(NEWEST)
                .replace("now-with-dashes/simple", "cantendwithadash-"),
        );

        let errs = load_and_validate(temp.path(), &GATED).unwrap_err();
        assert_eq!(errs.len(), 1);
        assert_eq!(
            errs[0].field,
            "providers[0].tokenAttributes.requiredServiceAccountAnnotationKeys"
        );
        assert!(errs[0].message.contains("\"cantendwithadash-\""));
    }
}
