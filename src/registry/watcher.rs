//! Schema directory watcher for hot reload.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::registry::SchemaRegistry;

/// Quiet period after the last change before reloading.
const DEBOUNCE: Duration = Duration::from_millis(300);

/// Watches the proto root and reloads the registry when files change.
pub struct SchemaWatcher {
    root: PathBuf,
    registry: Arc<SchemaRegistry>,
}

impl SchemaWatcher {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self {
            root: registry.root().to_path_buf(),
            registry,
        }
    }

    /// Start watching. The returned watcher must be kept alive; the reload
    /// task stops when `shutdown` is cancelled.
    pub fn run(self, shutdown: CancellationToken) -> Result<RecommendedWatcher, notify::Error> {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove() {
                        let _ = tx.send(());
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.root, RecursiveMode::Recursive)?;
        tracing::info!(path = ?self.root, "Schema watcher started");

        tokio::spawn(reload_loop(self.registry, rx, shutdown));
        Ok(watcher)
    }
}

async fn reload_loop(
    registry: Arc<SchemaRegistry>,
    mut changes: mpsc::UnboundedReceiver<()>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            change = changes.recv() => {
                if change.is_none() {
                    break;
                }
            }
        }

        // Coalesce bursts of events (editors write several times per save).
        loop {
            tokio::select! {
                _ = tokio::time::sleep(DEBOUNCE) => break,
                more = changes.recv() => {
                    if more.is_none() {
                        return;
                    }
                }
            }
        }

        tracing::info!("Schema change detected, reloading...");
        let _ = reload(&registry).await;
    }
    tracing::debug!("Schema watcher stopped");
}

/// Reload on a blocking thread; failures keep the current snapshot.
///
/// Returns the loaded service names, or the failure text.
pub async fn reload(registry: &Arc<SchemaRegistry>) -> Result<Vec<String>, String> {
    let registry = registry.clone();
    match tokio::task::spawn_blocking(move || registry.reload_all()).await {
        Ok(Ok(services)) => {
            tracing::info!(?services, "Schemas reloaded");
            Ok(services)
        }
        Ok(Err(e)) => {
            tracing::error!("Failed to reload schemas: {}. Keeping current registry.", e);
            Err(e.to_string())
        }
        Err(e) => {
            tracing::error!(error = %e, "Reload task panicked");
            Err(e.to_string())
        }
    }
}

/// Load or replace one service on a blocking thread; other services and
/// the rest of the snapshot are untouched.
pub async fn reload_service(registry: &Arc<SchemaRegistry>, name: &str) -> Result<(), String> {
    let registry = registry.clone();
    let service = name.to_string();
    match tokio::task::spawn_blocking(move || registry.load(&service)).await {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) => {
            tracing::error!(service = %name, "Failed to load service: {}. Keeping current registry.", e);
            Err(e.to_string())
        }
        Err(e) => {
            tracing::error!(service = %name, error = %e, "Load task panicked");
            Err(e.to_string())
        }
    }
}
