//! Startup orchestration.
//!
//! # Responsibilities
//! - Load the schema registry (fail fast)
//! - Build discovery, connector and dispatcher from configuration
//!
//! # Design Decisions
//! - Any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listeners are bound by the caller, after this returns

use std::sync::Arc;

use crate::config::{ConfigError, GatewayConfig};
use crate::discovery;
use crate::dispatch::{DispatchOptions, Dispatcher};
use crate::lifecycle::Shutdown;
use crate::registry::SchemaRegistry;
use crate::rpc::GrpcConnector;

/// Assemble the dispatcher for a validated configuration.
pub fn build_dispatcher(
    config: &GatewayConfig,
    shutdown: &Shutdown,
) -> Result<Arc<Dispatcher<GrpcConnector>>, ConfigError> {
    let registry = Arc::new(SchemaRegistry::open(&config.proto)?);
    let discovery = discovery::from_config(&config.discovery)?;
    let connector = GrpcConnector::new(config.timeouts.connect());

    tracing::info!(
        services = ?registry.services(),
        discovery = ?config.discovery.kind,
        balancer = ?config.discovery.balancer,
        call_timeout = ?config.timeouts.call(),
        "Gateway assembled"
    );

    Ok(Arc::new(Dispatcher::new(
        registry,
        discovery,
        connector,
        DispatchOptions::from_config(config),
        shutdown.subscribe(),
    )))
}
