//! Per-request orchestration.
//!
//! # Responsibilities
//! - Route, discover, acquire, transcode, invoke, wrap, serialize
//! - Report call outcomes back onto the pooled connection
//! - Bound every call by a cancellation token and an optional deadline
//!
//! # Design Decisions
//! - Steps run strictly in order; each failure returns before the next step
//! - Nothing is retried
//! - A failed remote call is a successful dispatch carrying a failure envelope
//! - The call token is a child of the process shutdown token and is
//!   cancelled on every exit path through a drop guard

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::uri::PathAndQuery;
use axum::http::Request;
use tokio_util::sync::CancellationToken;
use tonic::metadata::{AsciiMetadataKey, AsciiMetadataValue, MetadataMap};
use tonic::{Code, Status};

use crate::config::GatewayConfig;
use crate::discovery::Discovery;
use crate::error::GatewayError;
use crate::observability::metrics;
use crate::pool::ConnectionPool;
use crate::registry::SchemaRegistry;
use crate::routing::{router, ResolvedRoute, Router};
use crate::rpc::{Connector, RpcChannel};
use crate::transcode::{build_envelope, build_request, envelope};

const UNKNOWN_SERVICE: &str = "unknown";

/// Per-call limits.
#[derive(Debug, Clone, Copy)]
pub struct DispatchOptions {
    /// Deadline for one remote call; `None` leaves it unbounded.
    pub call_timeout: Option<Duration>,
    /// Largest accepted request body in bytes.
    pub max_body_size: usize,
}

impl DispatchOptions {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            call_timeout: config.timeouts.call(),
            max_body_size: config.listener.max_body_size,
        }
    }
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            call_timeout: Some(Duration::from_secs(30)),
            max_body_size: 2 * 1024 * 1024,
        }
    }
}

/// Turns HTTP requests into unary calls and their results into envelopes.
pub struct Dispatcher<C: Connector> {
    router: Router,
    discovery: Arc<dyn Discovery>,
    pool: ConnectionPool<C>,
    options: DispatchOptions,
    shutdown: CancellationToken,
}

impl<C: Connector> Dispatcher<C> {
    pub fn new(
        registry: Arc<SchemaRegistry>,
        discovery: Arc<dyn Discovery>,
        connector: C,
        options: DispatchOptions,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            router: Router::new(registry),
            discovery,
            pool: ConnectionPool::new(connector),
            options,
            shutdown,
        }
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        self.router.registry()
    }

    pub fn pool(&self) -> &ConnectionPool<C> {
        &self.pool
    }

    pub fn options(&self) -> &DispatchOptions {
        &self.options
    }

    /// Dispatch one inbound request and return the serialized envelope.
    ///
    /// `metadata` is forwarded verbatim as outgoing call metadata.
    pub async fn handle(
        &self,
        request: Request<Body>,
        metadata: Option<HashMap<String, String>>,
    ) -> Result<String, GatewayError> {
        let start = Instant::now();
        let service = service_label(self.registry(), request.uri().path());

        let result = self.dispatch(request, metadata).await;
        let outcome = match &result {
            Ok(Dispatched { invoked: true, .. }) => "ok",
            Ok(Dispatched { invoked: false, .. }) => "invocation_failed",
            Err(e) => e.kind(),
        };
        metrics::record_request(&service, outcome, start);

        result.map(|dispatched| dispatched.body)
    }

    async fn dispatch(
        &self,
        request: Request<Body>,
        metadata: Option<HashMap<String, String>>,
    ) -> Result<Dispatched, GatewayError> {
        let route = self.router.route(request.uri().path())?;
        let address = self.discovery.resolve(&route.service).await?;
        let connection = self.pool.acquire(&address).await?;

        let call = self.shutdown.child_token();
        let _release = call.clone().drop_guard();

        let input = build_request(
            &route.method,
            &route.entry.verb,
            request,
            self.options.max_body_size,
        )
        .await?;
        let (mut response, mut output) = build_envelope(&route.method);

        let mut outgoing = tonic::Request::new(input);
        if let Some(metadata) = &metadata {
            attach_metadata(outgoing.metadata_mut(), metadata);
        }
        if let Some(deadline) = self.options.call_timeout {
            outgoing.set_timeout(deadline);
        }

        let path = rpc_path(&route)?;
        tracing::debug!(service = %route.service, address = %address, path = %path, "Invoking backend");

        let channel = connection.handle();
        let result = tokio::select! {
            _ = call.cancelled() => return Err(GatewayError::Cancelled),
            result = with_deadline(channel.unary(outgoing, path, &mut output), self.options.call_timeout) => result?,
        };

        let invoked = match result {
            Ok(()) => {
                connection.mark_ready();
                envelope::set_data(&mut response, output)?;
                true
            }
            Err(status) => {
                if status.code() == Code::Unavailable {
                    connection.mark_transient_failure();
                } else {
                    connection.mark_ready();
                }
                let text = invocation_error(&status);
                tracing::warn!(service = %route.service, address = %address, error = %text, "Backend call failed");
                envelope::set_failure(&mut response, &text)?;
                false
            }
        };

        Ok(Dispatched {
            body: envelope::to_json(&response)?,
            invoked,
        })
    }
}

struct Dispatched {
    body: String,
    invoked: bool,
}

fn rpc_path(route: &ResolvedRoute) -> Result<PathAndQuery, GatewayError> {
    let path = route.rpc_path();
    PathAndQuery::try_from(path.as_str()).map_err(|_| GatewayError::MalformedPath(path))
}

async fn with_deadline<F: Future>(
    call: F,
    deadline: Option<Duration>,
) -> Result<F::Output, GatewayError> {
    match deadline {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .map_err(|_| GatewayError::Timeout(limit)),
        None => Ok(call.await),
    }
}

/// Metric label for the service a path names. Only loaded services get
/// their own label; anything else a client sends is `unknown`.
pub fn service_label(registry: &SchemaRegistry, path: &str) -> String {
    router::resolve(path)
        .ok()
        .map(|(service, _)| service)
        .filter(|service| registry.lookup(service).is_ok())
        .unwrap_or_else(|| UNKNOWN_SERVICE.to_string())
}

/// Envelope message text for a failed remote call.
pub fn invocation_error(status: &Status) -> String {
    format!("rpc error: code = {:?} desc = {}", status.code(), status.message())
}

/// Copy caller metadata onto the outgoing call, skipping entries whose key
/// is not a metadata name or whose value is not visible ASCII.
pub fn attach_metadata(target: &mut MetadataMap, metadata: &HashMap<String, String>) {
    for (key, value) in metadata {
        if !is_visible_ascii(value) {
            tracing::warn!(key = %key, "Skipping non-ASCII call metadata");
            continue;
        }
        let parsed_key = key.parse::<AsciiMetadataKey>();
        let parsed_value = value.parse::<AsciiMetadataValue>();
        match (parsed_key, parsed_value) {
            (Ok(key), Ok(value)) => {
                target.insert(key, value);
            }
            _ => tracing::warn!(key = %key, "Skipping invalid call metadata"),
        }
    }
}

fn is_visible_ascii(value: &str) -> bool {
    value.bytes().all(|b| b == b'\t' || (b' '..=b'~').contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_error_text() {
        let status = Status::unavailable("connection refused");
        assert_eq!(
            invocation_error(&status),
            "rpc error: code = Unavailable desc = connection refused"
        );
    }

    #[test]
    fn test_attach_metadata_skips_invalid() {
        let mut metadata = HashMap::new();
        metadata.insert("x-request-id".to_string(), "abc-123".to_string());
        metadata.insert("bad key".to_string(), "v".to_string());
        metadata.insert("x-tenant".to_string(), "caf\u{e9}".to_string());
        metadata.insert("x-trace".to_string(), "a\nb".to_string());
        metadata.insert("x-note".to_string(), "bell\u{7}".to_string());

        let mut target = MetadataMap::new();
        attach_metadata(&mut target, &metadata);

        assert_eq!(target.len(), 1);
        assert_eq!(target.get("x-request-id").unwrap().to_str().unwrap(), "abc-123");
    }

    #[test]
    fn test_service_label_only_names_loaded_services() {
        let (_dir, registry) = crate::registry::test_support::order_registry();

        assert_eq!(service_label(&registry, "/order/get"), "order");
        assert_eq!(service_label(&registry, "/order/no/such/path"), "order");
        assert_eq!(service_label(&registry, "/f3a9c1e2/get"), UNKNOWN_SERVICE);
        assert_eq!(service_label(&registry, "/"), UNKNOWN_SERVICE);
        assert_eq!(service_label(&registry, "nonsense"), UNKNOWN_SERVICE);
    }

    #[tokio::test]
    async fn test_deadline() {
        let limit = Duration::from_millis(10);
        let slow = tokio::time::sleep(Duration::from_secs(5));
        assert!(matches!(
            with_deadline(slow, Some(limit)).await,
            Err(GatewayError::Timeout(d)) if d == limit
        ));
        assert_eq!(with_deadline(async { 7 }, None).await.unwrap(), 7);
    }
}
