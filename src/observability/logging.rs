//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//!
//! # Design Decisions
//! - `RUST_LOG` wins; otherwise the configured level applies to this crate
//!   and to `tower_http`
//! - Human-readable fmt output

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

pub fn init_tracing(config: &ObservabilityConfig) {
    let fallback = default_filter(&config.log_level);
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn default_filter(level: &str) -> String {
    format!("grpc_gateway={level},tower_http={level}")
}
