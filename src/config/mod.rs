//! Credential provider configuration subsystem.
//!
//! Two components, evaluated in sequence:
//! 1. **Loader** ([`load_config`]) - resolves a file or directory to an
//!    ordered list of documents, decodes each through the version-aware
//!    strict codec, and concatenates provider lists into one merged
//!    configuration.
//! 2. **Validator** ([`validate_config`]) - walks the merged
//!    configuration and either confirms it is usable or returns every
//!    field-level violation in one aggregate.
//!
//! The loader never validates and the validator never touches the file
//! system. [`watcher`] composes the two into hot-reload with
//! all-or-nothing activation.

mod loader;
mod types;
mod validation;

pub mod schema;
pub mod watcher;

pub use loader::{ConfigError, load_config};
pub use types::{
    CacheDuration, CredentialProvider, CredentialProviderConfig, EnvVar, TokenAttributes,
};
pub use validation::{FeatureGates, validate_config};
