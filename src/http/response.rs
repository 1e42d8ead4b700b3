//! Gateway error responses.
//!
//! # Design Decisions
//! - Envelopes (including invocation failures) are always 200
//! - Gateway-level failures map to a status by kind; the body is the
//!   error's text

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::error::GatewayError;

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::MalformedPath(_) | GatewayError::Transcode(_) => StatusCode::BAD_REQUEST,
            GatewayError::ServiceNotFound(_)
            | GatewayError::RouteNotFound { .. }
            | GatewayError::SubServiceNotFound { .. }
            | GatewayError::MethodNotFound { .. } => StatusCode::NOT_FOUND,
            GatewayError::Discovery(_) | GatewayError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Connection(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::DiscoveryError;
    use crate::rpc::ConnectError;
    use std::time::Duration;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            GatewayError::MalformedPath("/x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GatewayError::ServiceNotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            GatewayError::from(DiscoveryError::NoInstances("order".into())).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            GatewayError::from(ConnectError {
                address: "10.0.0.1:1".into(),
                reason: "refused".into(),
            })
            .status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            GatewayError::Timeout(Duration::from_secs(1)).status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn test_into_response_status() {
        let response = GatewayError::ServiceNotFound("ghost".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
