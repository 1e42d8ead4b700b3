//! Admin endpoints.
//!
//! Served on a separate listener so they are never reachable through the
//! gateway's catch-all route.

pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use self::handlers::*;
use crate::dispatch::Dispatcher;
use crate::rpc::Connector;

pub struct AdminState<C: Connector> {
    pub dispatcher: Arc<Dispatcher<C>>,
}

impl<C: Connector> Clone for AdminState<C> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
        }
    }
}

pub fn setup_admin_router<C: Connector>(dispatcher: Arc<Dispatcher<C>>) -> Router {
    Router::new()
        .route("/admin/status", get(get_status::<C>))
        .route("/admin/services", get(get_services::<C>))
        .route("/admin/reload", post(post_reload::<C>))
        .route("/admin/reload/{service}", post(post_reload_service::<C>))
        .route("/admin/connections", get(get_connections::<C>))
        .with_state(AdminState { dispatcher })
}

/// Serve the admin router until `shutdown` is cancelled.
pub async fn serve_admin(
    listener: TcpListener,
    router: Router,
    shutdown: CancellationToken,
) -> Result<(), std::io::Error> {
    tracing::info!(address = %listener.local_addr()?, "Admin server starting");
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}
