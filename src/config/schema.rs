//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Where service schemas and route tables live.
    pub proto: ProtoConfig,

    /// How logical service names become backend addresses.
    pub discovery: DiscoveryConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Inbound headers forwarded as outgoing call metadata.
    pub metadata: MetadataConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin endpoints.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum accepted request body in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Schema source layout.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProtoConfig {
    /// Root directory holding one sub-directory per logical service.
    pub root: String,

    /// Route table file name inside each service directory.
    pub routes_file: String,

    /// Reload schemas when files under `root` change.
    pub watch: bool,
}

impl Default for ProtoConfig {
    fn default() -> Self {
        Self {
            root: "./api".to_string(),
            routes_file: "router.yaml".to_string(),
            watch: false,
        }
    }
}

/// Discovery backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryKind {
    /// Fixed address lists from this file.
    Static,
    /// Consul health API.
    Consul,
}

/// Instance selection strategy when a service has several instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BalancerKind {
    Random,
    RoundRobin,
}

/// Service discovery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub kind: DiscoveryKind,

    /// Consul HTTP API base URL.
    pub consul_address: String,

    pub balancer: BalancerKind,

    /// Static instances: logical service name -> ["host:port", ...].
    pub services: BTreeMap<String, Vec<String>>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            kind: DiscoveryKind::Static,
            consul_address: "http://127.0.0.1:8500".to_string(),
            balancer: BalancerKind::Random,
            services: BTreeMap::new(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Backend dial timeout in seconds.
    pub connect_secs: u64,

    /// Default deadline for a single remote call in seconds (0 = none).
    pub call_secs: u64,

    /// Whole inbound request timeout in seconds.
    pub request_secs: u64,
}

impl TimeoutConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    /// Call deadline, `None` when unbounded.
    pub fn call(&self) -> Option<Duration> {
        (self.call_secs > 0).then(|| Duration::from_secs(self.call_secs))
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            call_secs: 30,
            request_secs: 60,
        }
    }
}

/// Outgoing call metadata.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// Inbound header names copied verbatim onto the outbound call.
    pub forward_headers: Vec<String>,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            forward_headers: vec!["x-request-id".to_string()],
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin endpoints configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin endpoints.
    pub enabled: bool,

    /// Admin bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: GatewayConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.proto.routes_file, "router.yaml");
        assert_eq!(config.discovery.kind, DiscoveryKind::Static);
        assert_eq!(config.discovery.balancer, BalancerKind::Random);
        assert_eq!(config.timeouts.call(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_discovery_section() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [discovery]
            kind = "consul"
            balancer = "round_robin"

            [discovery.services]
            order = ["10.0.0.1:50051", "10.0.0.2:50051"]
            "#,
        )
        .unwrap();
        assert_eq!(config.discovery.kind, DiscoveryKind::Consul);
        assert_eq!(config.discovery.balancer, BalancerKind::RoundRobin);
        assert_eq!(config.discovery.services["order"].len(), 2);
    }

    #[test]
    fn test_zero_call_timeout_is_unbounded() {
        let timeouts = TimeoutConfig {
            call_secs: 0,
            ..TimeoutConfig::default()
        };
        assert_eq!(timeouts.call(), None);
    }
}
