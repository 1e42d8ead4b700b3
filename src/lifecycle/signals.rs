//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGTERM, SIGINT, SIGHUP)
//! - Translate signals to internal events
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - SIGHUP triggers a schema reload, not shutdown

use std::sync::Arc;

use crate::lifecycle::Shutdown;
use crate::registry::{watcher, SchemaRegistry};

/// Wait for Ctrl+C or SIGTERM, then trigger shutdown.
pub async fn shutdown_on_signal(shutdown: Shutdown) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
        _ = shutdown.wait() => return,
    }

    tracing::info!("Shutdown signal received");
    shutdown.trigger();
}

/// Reload schemas on every SIGHUP until shutdown.
#[cfg(unix)]
pub async fn reload_on_hangup(registry: Arc<SchemaRegistry>, shutdown: Shutdown) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(hangup) => hangup,
        Err(e) => {
            tracing::error!(error = %e, "Failed to install SIGHUP handler");
            return;
        }
    };

    loop {
        tokio::select! {
            _ = shutdown.wait() => break,
            received = hangup.recv() => {
                if received.is_none() {
                    break;
                }
                tracing::info!("SIGHUP received, reloading schemas");
                let _ = watcher::reload(&registry).await;
            }
        }
    }
}

#[cfg(not(unix))]
pub async fn reload_on_hangup(_registry: Arc<SchemaRegistry>, _shutdown: Shutdown) {}
