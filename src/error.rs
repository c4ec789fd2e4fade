//! Structured field-level validation errors.
//!
//! Validation never fails fast: every rule that fails contributes one
//! [`FieldError`] to a [`ValidationErrors`] aggregate so a single run
//! surfaces every problem in the configuration.

use serde::Serialize;
use std::fmt;

/// Violation categories for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// A required field is absent or empty.
    Required,
    /// A field is present but its value is malformed.
    Invalid,
    /// A field is present but not allowed in this configuration.
    Forbidden,
    /// A value appears more than once where uniqueness is required.
    Duplicate,
    /// A value is outside a fixed supported set.
    Unsupported,
}

/// One field-level violation: where it is, what kind, and why.
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    /// Path to the offending field, e.g. `providers[0].name`.
    pub field: String,
    pub kind: ViolationKind,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind,
            message: message.into(),
        }
    }

    // Convenience constructors

    pub fn required(field: impl Into<String>, detail: &str) -> Self {
        Self::new(
            field,
            ViolationKind::Required,
            format!("Required value: {}", detail),
        )
    }

    pub fn invalid(field: impl Into<String>, value: &str, reason: &str) -> Self {
        Self::new(
            field,
            ViolationKind::Invalid,
            format!("Invalid value: {:?}: {}", value, reason),
        )
    }

    pub fn forbidden(field: impl Into<String>, reason: &str) -> Self {
        Self::new(field, ViolationKind::Forbidden, format!("Forbidden: {}", reason))
    }

    pub fn duplicate(field: impl Into<String>, value: &str) -> Self {
        Self::new(
            field,
            ViolationKind::Duplicate,
            format!("Duplicate value: {:?}", value),
        )
    }

    pub fn unsupported(field: impl Into<String>, value: &str, supported: &[&str]) -> Self {
        let supported = supported
            .iter()
            .map(|v| format!("{:?}", v))
            .collect::<Vec<_>>()
            .join(", ");
        Self::new(
            field,
            ViolationKind::Unsupported,
            format!("Unsupported value: {:?}: supported values: {}", value, supported),
        )
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Aggregate of every violation found in one validation pass.
///
/// The order is discovery order: entry order, then within-entry field
/// order, with the cross-entry duplicate-name pass last.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for err in &self.errors {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{}", err)?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}
