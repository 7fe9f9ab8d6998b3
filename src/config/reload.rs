//! Configuration file watching for hot reload of tunables.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::config::loader::load_config;
use crate::config::schema::WatcherConfig;

/// Watches the configuration file and swaps tunables in place.
///
/// Thresholds, windows and alert settings take effect on the next
/// evaluation tick. Pool topology is fixed at startup; a reload that
/// changes it is rejected wholesale.
pub struct ConfigReloader {
    path: PathBuf,
    live: Arc<ArcSwap<WatcherConfig>>,
}

impl ConfigReloader {
    pub fn new(path: &Path, live: Arc<ArcSwap<WatcherConfig>>) -> Self {
        Self {
            path: path.to_path_buf(),
            live,
        }
    }

    /// Start watching the file. The returned watcher must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let live = self.live.clone();
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!("Config file change detected, reloading...");
                        match load_config(&path) {
                            Ok(new_config) => {
                                let current = live.load();
                                if topology_changed(&current, &new_config) {
                                    tracing::warn!(
                                        "Reload changes pool topology; restart required. \
                                         Keeping current configuration."
                                    );
                                    return;
                                }
                                live.store(Arc::new(new_config));
                                tracing::info!("Configuration reloaded");
                            }
                            Err(e) => {
                                tracing::error!(
                                    "Failed to reload config: {}. Keeping current configuration.",
                                    e
                                );
                            }
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config reloader started");
        Ok(watcher)
    }
}

fn topology_changed(current: &WatcherConfig, new: &WatcherConfig) -> bool {
    current.pools.primary.name != new.pools.primary.name
        || current.pools.primary.address != new.pools.primary.address
        || current.pools.backup.name != new.pools.backup.name
        || current.pools.backup.address != new.pools.backup.address
}
