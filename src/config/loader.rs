//! Configuration loading and merging.
//!
//! Resolves a caller-supplied path to an ordered list of documents,
//! decodes each through the version-aware strict codec, and concatenates
//! the provider lists into one merged configuration. The loader applies
//! no structural validation; that is [`super::validation`]'s job, kept
//! separate so validation errors can be aggregated instead of failing on
//! the first bad file.

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use super::schema::{self, DecodeError};
use super::types::CredentialProviderConfig;

/// File extensions recognized when scanning a configuration directory.
/// Everything else is silently skipped.
const SUPPORTED_EXTENSIONS: &[&str] = &["json", "yaml", "yml"];

/// A fatal load failure. Loading is fail-fast: there is no partial
/// configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no configuration files found in directory {}", dir.display())]
    NoConfigFiles { dir: PathBuf },

    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },
}

/// Load and merge configuration from a file or directory.
///
/// A regular file is decoded as one document. A directory is scanned for
/// immediate entries with a supported extension, which are decoded in
/// lexicographic filename order; their provider lists are concatenated in
/// that order. A directory yielding zero documents is an error, not an
/// empty configuration.
///
/// # Errors
///
/// Returns [`ConfigError`] for unreadable paths, empty directories,
/// malformed documents, unknown schemas, and unknown fields.
pub fn load_config(path: &Path) -> Result<CredentialProviderConfig, ConfigError> {
    let metadata = fs::metadata(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let files = if metadata.is_dir() {
        discover_config_files(path)?
    } else {
        vec![path.to_path_buf()]
    };

    let mut merged = CredentialProviderConfig::default();
    for file in files {
        let document = load_document(&file)?;
        debug!(
            file = %file.display(),
            providers = document.providers.len(),
            "loaded configuration document"
        );
        merged.providers.extend(document.providers);
    }
    Ok(merged)
}

/// Scan a directory for eligible configuration files.
///
/// The byte-wise filename sort is load-bearing: it fixes the provider
/// concatenation order, and therefore which occurrence of a duplicate
/// name is reported as the duplicate.
fn discover_config_files(dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let entries = fs::read_dir(dir).map_err(|source| ConfigError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_file() && has_supported_extension(&path) {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    if files.is_empty() {
        return Err(ConfigError::NoConfigFiles {
            dir: dir.to_path_buf(),
        });
    }
    Ok(files)
}

fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext))
}

/// Decode one file into the version-neutral configuration.
fn load_document(path: &Path) -> Result<CredentialProviderConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    // One grammar for both formats: YAML is a superset of JSON, so JSON
    // files go through the same parser.
    let value: Value = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    schema::decode_document(&value).map_err(|source| ConfigError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MINIMAL_V1: &str = r#"
kind: CredentialProviderConfig
apiVersion: pullcreds.dev/v1
providers:
  - name: PROVIDER
    matchImages:
    - "registry.io/image"
    defaultCacheDuration: 10m
    apiVersion: credentialprovider.pullcreds.dev/v1
"#;

    fn doc_with_name(name: &str) -> String {
        MINIMAL_V1.replace("PROVIDER", name)
    }

    #[test]
    fn test_load_single_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(&path, doc_with_name("test")).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.providers.len(), 1);
        assert_eq!(config.providers[0].name, "test");
    }

    #[test]
    fn test_missing_path_is_io_error() {
        let temp = TempDir::new().unwrap();
        let err = load_config(&temp.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_empty_directory_fails() {
        let temp = TempDir::new().unwrap();
        let err = load_config(temp.path()).unwrap_err();
        assert!(
            err.to_string()
                .contains("no configuration files found in directory")
        );
    }

    #[test]
    fn test_directory_with_only_unsupported_extensions_fails() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("config.txt"), "text file").unwrap();
        std::fs::write(temp.path().join("config.md"), "markdown file").unwrap();

        let err = load_config(temp.path()).unwrap_err();
        assert!(matches!(err, ConfigError::NoConfigFiles { .. }));
    }

    #[test]
    fn test_directory_merges_in_lexicographic_order() {
        let temp = TempDir::new().unwrap();
        // Written in reverse order on purpose; merge order must come from
        // the filename sort, not creation order.
        std::fs::write(temp.path().join("config-002.yaml"), doc_with_name("test2")).unwrap();
        std::fs::write(temp.path().join("config-001.yaml"), doc_with_name("test1")).unwrap();

        let config = load_config(temp.path()).unwrap();
        let names: Vec<_> = config.providers.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["test1", "test2"]);
    }

    #[test]
    fn test_directory_skips_unsupported_extensions() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("config-001.yaml"), doc_with_name("test1")).unwrap();
        std::fs::write(temp.path().join("config-002.txt"), "not a config").unwrap();
        std::fs::write(
            temp.path().join("config-003.json"),
            r#"{
  "kind": "CredentialProviderConfig",
  "apiVersion": "pullcreds.dev/v1",
  "providers": [
    {
      "name": "test3",
      "matchImages": ["registry.io/other"],
      "defaultCacheDuration": "5m",
      "apiVersion": "credentialprovider.pullcreds.dev/v1"
    }
  ]
}"#,
        )
        .unwrap();

        let config = load_config(temp.path()).unwrap();
        let names: Vec<_> = config.providers.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["test1", "test3"]);
    }

    #[test]
    fn test_yaml_and_json_decode_identically() {
        let temp = TempDir::new().unwrap();
        let yaml_path = temp.path().join("config.yaml");
        let json_path = temp.path().join("config.json");
        std::fs::write(&yaml_path, doc_with_name("test")).unwrap();
        std::fs::write(
            &json_path,
            r#"{
  "kind": "CredentialProviderConfig",
  "apiVersion": "pullcreds.dev/v1",
  "providers": [
    {
      "name": "test",
      "matchImages": ["registry.io/image"],
      "defaultCacheDuration": "10m",
      "apiVersion": "credentialprovider.pullcreds.dev/v1"
    }
  ]
}"#,
        )
        .unwrap();

        let from_yaml = load_config(&yaml_path).unwrap();
        let from_json = load_config(&json_path).unwrap();
        assert_eq!(from_yaml, from_json);
    }

    #[test]
    fn test_decode_failure_names_the_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.yaml");
        std::fs::write(
            &path,
            "kind: WrongKind\napiVersion: pullcreds.dev/v1\nproviders: []\n",
        )
        .unwrap();

        let err = load_config(&path).unwrap_err();
        let rendered = err.to_string();
        assert!(rendered.contains("bad.yaml"));
        assert!(matches!(err, ConfigError::Decode { .. }));
    }

    #[test]
    fn test_loader_does_not_validate() {
        // Duplicate names across files load fine; the validator owns
        // structural checks.
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("a.yaml"),
            doc_with_name("duplicate"),
        )
        .unwrap();
        std::fs::write(
            temp.path().join("b.yaml"),
            doc_with_name("duplicate"),
        )
        .unwrap();

        let config = load_config(temp.path()).unwrap();
        assert_eq!(config.providers.len(), 2);
    }
}
