//! Pull-credential provider configuration.
//!
//! Loads, merges, and validates the configuration documents that bind
//! external registry credential helpers to image-match patterns, cache
//! durations, and wire-protocol versions.

pub mod cli;
pub mod config;
pub mod error;
