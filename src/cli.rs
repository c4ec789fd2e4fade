//! CLI command definitions for pullcreds
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for the `print` subcommand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum PrintFormat {
    /// YAML output (default)
    #[default]
    Yaml,
    /// Pretty-printed JSON output
    Json,
}

/// Credential provider configuration tools
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable the service account token feature gate, which permits
    /// tokenAttributes on newest-version providers
    #[arg(long, global = true)]
    pub enable_service_account_tokens: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load and validate a configuration file or directory
    Check {
        /// Path to the configuration file or directory
        path: PathBuf,
    },

    /// Print the merged, validated configuration
    Print {
        /// Path to the configuration file or directory
        path: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: PrintFormat,
    },

    /// Watch a configuration path and revalidate on every change
    Watch {
        /// Path to the configuration file or directory
        path: PathBuf,
    },
}
