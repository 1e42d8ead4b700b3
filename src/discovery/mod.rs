//! Service discovery subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher has a logical service name
//!     → Discovery::resolve
//!         - static_list.rs (addresses from config)
//!         - consul.rs (passing instances from the health API)
//!     → balancer.rs picks one candidate
//!     → "host:port" handed to the connection pool
//! ```
//!
//! # Design Decisions
//! - Selection strategy is pluggable and independent of the source
//! - Zero candidates is an error, never an empty address
//! - Resolution is attempted once per request; no retries

pub mod balancer;
pub mod consul;
pub mod static_list;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

use crate::config::validation::ValidationError;
use crate::config::{ConfigError, DiscoveryConfig, DiscoveryKind};

pub use balancer::{Balancer, RandomBalancer, RoundRobin};
pub use consul::ConsulDiscovery;
pub use static_list::StaticDiscovery;

#[derive(Debug, Clone, Error)]
pub enum DiscoveryError {
    #[error("no healthy instance available for service {0}")]
    NoInstances(String),

    #[error("discovery lookup for service {service} failed: {message}")]
    Lookup { service: String, message: String },
}

/// Resolves a logical service name to one backend address.
#[async_trait]
pub trait Discovery: Send + Sync {
    async fn resolve(&self, service: &str) -> Result<String, DiscoveryError>;
}

/// Build the configured discovery source.
pub fn from_config(config: &DiscoveryConfig) -> Result<Arc<dyn Discovery>, ConfigError> {
    let balancer = balancer::from_kind(config.balancer);
    match config.kind {
        DiscoveryKind::Static => Ok(Arc::new(StaticDiscovery::new(
            config.services.clone(),
            balancer,
        ))),
        DiscoveryKind::Consul => {
            let base = Url::parse(&config.consul_address).map_err(|e| {
                ConfigError::Validation(vec![ValidationError {
                    field: "discovery.consul_address".to_string(),
                    message: e.to_string(),
                }])
            })?;
            Ok(Arc::new(ConsulDiscovery::new(base, balancer)))
        }
    }
}
