//! Request-level error kinds.
//!
//! Every variant aborts the request before (or instead of) producing an
//! envelope. Remote invocation failures are not represented here: they are
//! carried inside the envelope as a successful gateway call.

use std::time::Duration;

use thiserror::Error;

use crate::config::ConfigError;
use crate::discovery::DiscoveryError;
use crate::rpc::ConnectError;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("request path illegal: {0}")]
    MalformedPath(String),

    #[error("service {0} not registered")]
    ServiceNotFound(String),

    #[error("service {service} has no route for path {route}")]
    RouteNotFound { service: String, route: String },

    #[error("service {service} has no sub service {sub_service}")]
    SubServiceNotFound { service: String, sub_service: String },

    #[error("service {service} has no method {method} on {sub_service}")]
    MethodNotFound {
        service: String,
        sub_service: String,
        method: String,
    },

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Connection(#[from] ConnectError),

    #[error("fill request message error: {0}")]
    Transcode(String),

    #[error("call deadline of {0:?} exceeded")]
    Timeout(Duration),

    #[error("call cancelled")]
    Cancelled,
}

impl GatewayError {
    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Config(_) => "config",
            GatewayError::MalformedPath(_) => "malformed_path",
            GatewayError::ServiceNotFound(_) => "service_not_found",
            GatewayError::RouteNotFound { .. } => "route_not_found",
            GatewayError::SubServiceNotFound { .. } => "sub_service_not_found",
            GatewayError::MethodNotFound { .. } => "method_not_found",
            GatewayError::Discovery(_) => "discovery",
            GatewayError::Connection(_) => "connection",
            GatewayError::Transcode(_) => "transcode",
            GatewayError::Timeout(_) => "timeout",
            GatewayError::Cancelled => "cancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GatewayError::RouteNotFound {
            service: "order".into(),
            route: "/nope".into(),
        };
        assert_eq!(err.to_string(), "service order has no route for path /nope");
        assert_eq!(err.kind(), "route_not_found");

        let err = GatewayError::Discovery(DiscoveryError::NoInstances("order".into()));
        assert_eq!(err.kind(), "discovery");
        assert!(err.to_string().contains("order"));
    }
}
