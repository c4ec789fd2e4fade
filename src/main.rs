//! pullcreds CLI
//!
//! Loads, validates, prints, and watches credential provider
//! configuration for a container host's pluggable credential helpers.

use anyhow::Result;
use clap::Parser;
use pullcreds::cli::{Cli, Command, PrintFormat};
use pullcreds::config::watcher::{
    ActiveConfig, WatcherConfig, start_config_watcher, watch_and_reload,
};
use pullcreds::config::{FeatureGates, load_config, validate_config};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on --log option
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    match cli.log.as_str() {
        "0" | "off" => {
            // No logging
        }
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            // Log to file (append mode)
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    let features = FeatureGates {
        service_account_tokens: cli.enable_service_account_tokens,
    };

    match cli.command {
        Command::Check { path } => run_check(&path, &features),
        Command::Print { path, format } => run_print(&path, &features, format),
        Command::Watch { path } => run_watch(path, features).await,
    }
}

/// Load and validate, printing one line per field error.
fn run_check(path: &Path, features: &FeatureGates) -> Result<()> {
    let config = load_config(path)?;
    match validate_config(&config, features) {
        Ok(()) => {
            println!(
                "{}: configuration is valid ({} provider(s))",
                path.display(),
                config.providers.len()
            );
            Ok(())
        }
        Err(errors) => {
            for err in &errors.errors {
                eprintln!("{}", err);
            }
            anyhow::bail!("configuration is invalid: {} error(s)", errors.len());
        }
    }
}

/// Load, validate, and emit the merged normalized configuration.
fn run_print(path: &Path, features: &FeatureGates, format: PrintFormat) -> Result<()> {
    let config = load_config(path)?;
    if let Err(errors) = validate_config(&config, features) {
        for err in &errors.errors {
            eprintln!("{}", err);
        }
        anyhow::bail!("configuration is invalid: {} error(s)", errors.len());
    }

    match format {
        PrintFormat::Yaml => print!("{}", serde_yaml::to_string(&config)?),
        PrintFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
    }
    Ok(())
}

/// Validate once, then keep revalidating on file changes. The last valid
/// configuration stays active whenever a change fails to load or
/// validate.
async fn run_watch(path: std::path::PathBuf, features: FeatureGates) -> Result<()> {
    let active = Arc::new(ActiveConfig::load(path, features)?);
    info!(
        providers = active.current().providers.len(),
        "Initial configuration loaded"
    );

    let handle = start_config_watcher(active.path(), WatcherConfig::default())?;
    watch_and_reload(active, handle).await;
    Ok(())
}
