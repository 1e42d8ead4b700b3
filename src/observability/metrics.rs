//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (requests, latency, dials, reloads, pool size)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by service, outcome
//! - `gateway_request_duration_seconds` (histogram): latency by service
//! - `gateway_dials_total` (counter): backend dials by address, result
//! - `gateway_dial_duration_seconds` (histogram): dial latency
//! - `gateway_registry_reloads_total` (counter): schema reloads by result
//! - `gateway_pool_connections` (gauge): pooled backend addresses
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed, so tests need no setup
//! - Outcome labels reuse `GatewayError::kind`

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(service: &str, outcome: &str, start: Instant) {
    ::metrics::counter!(
        "gateway_requests_total",
        "service" => service.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
    ::metrics::histogram!(
        "gateway_request_duration_seconds",
        "service" => service.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_dial(address: &str, ok: bool, start: Instant) {
    let result = if ok { "ok" } else { "error" };
    ::metrics::counter!(
        "gateway_dials_total",
        "address" => address.to_string(),
        "result" => result
    )
    .increment(1);
    ::metrics::histogram!("gateway_dial_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_registry_reload(ok: bool) {
    let result = if ok { "ok" } else { "error" };
    ::metrics::counter!("gateway_registry_reloads_total", "result" => result).increment(1);
}

pub fn record_pool_size(size: usize) {
    ::metrics::gauge!("gateway_pool_connections").set(size as f64);
}
