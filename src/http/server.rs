//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the catch-all gateway handler
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Hand each request to the dispatcher with its forwarded metadata
//! - Serve until the shutdown token fires

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::dispatch::Dispatcher;
use crate::http::request::{outgoing_metadata, request_id};
use crate::rpc::Connector;

/// Application state injected into handlers.
pub struct AppState<C: Connector> {
    pub dispatcher: Arc<Dispatcher<C>>,
    pub forward_headers: Arc<[String]>,
}

impl<C: Connector> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
            forward_headers: self.forward_headers.clone(),
        }
    }
}

/// HTTP front end of the gateway.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new<C: Connector>(config: &GatewayConfig, dispatcher: Arc<Dispatcher<C>>) -> Self {
        let state = AppState {
            dispatcher,
            forward_headers: config.metadata.forward_headers.clone().into(),
        };
        Self {
            router: Self::build_router(config, state),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router<C: Connector>(config: &GatewayConfig, state: AppState<C>) -> Router {
        let middleware = ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(RequestBodyLimitLayer::new(config.listener.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)));

        Router::new()
            .route("/{*path}", any(gateway_handler::<C>))
            .with_state(state)
            .layer(middleware)
    }

    /// The configured router, for serving on a custom listener.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Run the server until `shutdown` is cancelled.
    pub async fn run(self, listener: TcpListener, shutdown: CancellationToken) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all handler: every path goes through the dispatcher.
async fn gateway_handler<C: Connector>(
    State(state): State<AppState<C>>,
    request: Request<Body>,
) -> Response {
    let request_id = request_id(request.headers()).to_string();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let metadata = outgoing_metadata(request.headers(), &state.forward_headers);

    tracing::debug!(request_id = %request_id, method = %method, path = %path, "Dispatching request");

    match state.dispatcher.handle(request, metadata).await {
        Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(e) => {
            tracing::info!(
                request_id = %request_id,
                path = %path,
                kind = e.kind(),
                error = %e,
                "Request rejected"
            );
            e.into_response()
        }
    }
}
