//! File watcher and atomic hot-reload.
//!
//! Watches the configuration path (file or directory) and emits reload
//! events through a tokio watch channel, debounced to coalesce rapid
//! changes. [`ActiveConfig`] pairs the watcher with all-or-nothing
//! activation: a reload builds a brand-new configuration from disk,
//! validates it fully, and only then atomically swaps it in. The old
//! configuration stays active until the new one passes in its entirety.

use arc_swap::ArcSwap;
use notify_debouncer_mini::{DebouncedEventKind, new_debouncer};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::loader::load_config;
use super::types::CredentialProviderConfig;
use super::validation::{FeatureGates, validate_config};

/// Event types emitted when configuration files change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigChangeEvent {
    /// One or more configuration documents changed.
    Changed(Vec<PathBuf>),
    /// Watcher encountered an error.
    Error(String),
}

impl ConfigChangeEvent {
    /// Returns true if this event requires a config reload.
    pub fn requires_reload(&self) -> bool {
        !matches!(self, ConfigChangeEvent::Error(_))
    }
}

/// Configuration for the file watcher.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Debounce duration for coalescing rapid changes.
    pub debounce_duration: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce_duration: Duration::from_millis(500),
        }
    }
}

/// Handle to control the config watcher.
pub struct ConfigWatcherHandle {
    /// Receiver for config change events.
    pub events: watch::Receiver<Option<ConfigChangeEvent>>,
    /// Handle to the watcher task (dropping this will stop the watcher).
    _task_handle: tokio::task::JoinHandle<()>,
}

impl ConfigWatcherHandle {
    /// Wait for the next config change event.
    pub async fn wait_for_change(&mut self) -> Option<ConfigChangeEvent> {
        // Skip the initial None value
        loop {
            if self.events.changed().await.is_err() {
                return None; // Sender dropped
            }
            let event = self.events.borrow().clone();
            if event.is_some() {
                return event;
            }
        }
    }
}

/// Starts the configuration file watcher for a config file or directory.
///
/// # Errors
///
/// Returns the underlying [`notify::Error`] when the watch cannot be
/// established (e.g. the path does not exist).
pub fn start_config_watcher(
    path: &Path,
    config: WatcherConfig,
) -> Result<ConfigWatcherHandle, notify::Error> {
    let (event_tx, event_rx) = watch::channel(None);
    let (notify_tx, notify_rx) = mpsc::channel();

    let mut debouncer = new_debouncer(config.debounce_duration, notify_tx)?;

    info!("Watching configuration path: {}", path.display());
    debouncer
        .watcher()
        .watch(path, notify::RecursiveMode::NonRecursive)?;

    let watched = path.to_path_buf();
    let task_handle = tokio::task::spawn_blocking(move || {
        // Keep the debouncer alive
        let _debouncer = debouncer;

        process_notify_events(notify_rx, event_tx, &watched);
    });

    Ok(ConfigWatcherHandle {
        events: event_rx,
        _task_handle: task_handle,
    })
}

/// Process events from the notify debouncer and convert to ConfigChangeEvents.
fn process_notify_events(
    rx: mpsc::Receiver<Result<Vec<notify_debouncer_mini::DebouncedEvent>, notify::Error>>,
    tx: watch::Sender<Option<ConfigChangeEvent>>,
    watched: &Path,
) {
    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                if let Some(event) = classify_events(events, watched) {
                    debug!("Config change detected: {:?}", event);
                    if tx.send(Some(event)).is_err() {
                        info!("Config watcher receiver dropped, stopping");
                        return;
                    }
                }
            }
            Ok(Err(e)) => {
                error!("File watcher error: {}", e);
                let _ = tx.send(Some(ConfigChangeEvent::Error(e.to_string())));
            }
            Err(_) => {
                info!("Config watcher channel closed, stopping");
                return;
            }
        }
    }
}

/// Collect the changed paths that are actually configuration documents.
fn classify_events(
    events: Vec<notify_debouncer_mini::DebouncedEvent>,
    watched: &Path,
) -> Option<ConfigChangeEvent> {
    let mut changed: Vec<PathBuf> = Vec::new();
    for event in events {
        if !matches!(
            event.kind,
            DebouncedEventKind::Any | DebouncedEventKind::AnyContinuous
        ) {
            continue;
        }
        if is_config_path(&event.path, watched) && !changed.contains(&event.path) {
            changed.push(event.path);
        }
    }
    if changed.is_empty() {
        None
    } else {
        Some(ConfigChangeEvent::Changed(changed))
    }
}

/// The watched path itself, or any file inside it with a recognized
/// structured-data extension. Editor temp files and the like are ignored.
fn is_config_path(path: &Path, watched: &Path) -> bool {
    if path == watched {
        return true;
    }
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml") | Some("json")
    )
}

/// The currently active, fully validated configuration.
///
/// Readers get cheap snapshots through `ArcSwap`; a reload either swaps
/// in a complete, valid replacement or leaves the current value alone.
pub struct ActiveConfig {
    current: ArcSwap<CredentialProviderConfig>,
    path: PathBuf,
    features: FeatureGates,
}

impl ActiveConfig {
    /// Load and fully validate the initial configuration.
    ///
    /// # Errors
    ///
    /// Returns the load or validation failure; there is no fallback
    /// configuration at startup.
    pub fn load(path: impl Into<PathBuf>, features: FeatureGates) -> anyhow::Result<Self> {
        let path = path.into();
        let config = load_config(&path)?;
        validate_config(&config, &features)?;
        Ok(Self {
            current: ArcSwap::from_pointee(config),
            path,
            features,
        })
    }

    /// Snapshot of the active configuration.
    pub fn current(&self) -> Arc<CredentialProviderConfig> {
        self.current.load_full()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rebuild the configuration from disk and swap it in atomically.
    ///
    /// # Errors
    ///
    /// Returns the load or validation failure. On error the previously
    /// active configuration remains in place, untouched.
    pub fn reload(&self) -> anyhow::Result<()> {
        let config = load_config(&self.path)?;
        validate_config(&config, &self.features)?;
        self.current.store(Arc::new(config));
        Ok(())
    }
}

/// Drive reloads from watcher events until the watcher stops.
///
/// A failed reload keeps the current configuration and logs the failure;
/// the loop keeps running so a later fix on disk takes effect.
pub async fn watch_and_reload(active: Arc<ActiveConfig>, mut handle: ConfigWatcherHandle) {
    while let Some(event) = handle.wait_for_change().await {
        if !event.requires_reload() {
            continue;
        }
        match active.reload() {
            Ok(()) => {
                info!(
                    providers = active.current().providers.len(),
                    "Configuration reloaded"
                );
            }
            Err(e) => {
                warn!("Config reload failed: {}. Keeping current configuration.", e);
            }
        }
    }
    info!("Config file watcher stopped");
}
