//! Inbound request inspection.
//!
//! # Responsibilities
//! - Select the inbound headers forwarded as outgoing call metadata
//! - Read the request ID for logging
//!
//! # Design Decisions
//! - Header names are matched case-insensitively; values that are not valid
//!   UTF-8 are dropped
//! - An empty selection means no metadata at all

use std::collections::HashMap;

use axum::http::HeaderMap;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Collect the configured headers into call metadata.
pub fn outgoing_metadata(
    headers: &HeaderMap,
    forward_headers: &[String],
) -> Option<HashMap<String, String>> {
    let metadata: HashMap<String, String> = forward_headers
        .iter()
        .filter_map(|name| {
            let value = headers.get(name.as_str())?.to_str().ok()?;
            Some((name.to_ascii_lowercase(), value.to_string()))
        })
        .collect();

    (!metadata.is_empty()).then_some(metadata)
}

pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}
