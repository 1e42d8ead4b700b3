use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;

use crate::admin::AdminState;
use crate::pool::ConnectionSummary;
use crate::registry::watcher;
use crate::rpc::Connector;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub registry_version: u64,
    pub services: usize,
    pub connections: usize,
}

#[derive(Serialize)]
pub struct RouteView {
    pub verb: String,
    pub sub_service: String,
    pub method: String,
}

#[derive(Serialize)]
pub struct ServiceView {
    pub name: String,
    pub import_path: String,
    pub sub_services: Vec<String>,
    pub routes: BTreeMap<String, RouteView>,
}

#[derive(Serialize)]
pub struct ReloadResult {
    pub reloaded: bool,
    pub services: Vec<String>,
    pub error: Option<String>,
}

pub async fn get_status<C: Connector>(State(state): State<AdminState<C>>) -> Json<SystemStatus> {
    let snapshot = state.dispatcher.registry().snapshot();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        registry_version: snapshot.version,
        services: snapshot.services.len(),
        connections: state.dispatcher.pool().connections().len(),
    })
}

pub async fn get_services<C: Connector>(State(state): State<AdminState<C>>) -> Json<Vec<ServiceView>> {
    let snapshot = state.dispatcher.registry().snapshot();
    let mut views: Vec<ServiceView> = snapshot
        .services
        .values()
        .map(|service| {
            let mut sub_services: Vec<String> = service.sub_services.keys().cloned().collect();
            sub_services.sort();
            ServiceView {
                name: service.name.clone(),
                import_path: service.import_path.display().to_string(),
                sub_services,
                routes: service
                    .routes
                    .iter()
                    .map(|(path, entry)| {
                        (
                            path.clone(),
                            RouteView {
                                verb: entry.verb.to_string(),
                                sub_service: entry.sub_service.clone(),
                                method: entry.method.clone(),
                            },
                        )
                    })
                    .collect(),
            }
        })
        .collect();
    views.sort_by(|a, b| a.name.cmp(&b.name));
    Json(views)
}

pub async fn post_reload<C: Connector>(State(state): State<AdminState<C>>) -> impl IntoResponse {
    match watcher::reload(state.dispatcher.registry()).await {
        Ok(services) => (
            StatusCode::OK,
            Json(ReloadResult {
                reloaded: true,
                services,
                error: None,
            }),
        ),
        Err(error) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ReloadResult {
                reloaded: false,
                services: state.dispatcher.registry().services(),
                error: Some(error),
            }),
        ),
    }
}

pub async fn post_reload_service<C: Connector>(
    State(state): State<AdminState<C>>,
    Path(service): Path<String>,
) -> impl IntoResponse {
    match watcher::reload_service(state.dispatcher.registry(), &service).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ReloadResult {
                reloaded: true,
                services: vec![service],
                error: None,
            }),
        ),
        Err(error) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ReloadResult {
                reloaded: false,
                services: state.dispatcher.registry().services(),
                error: Some(error),
            }),
        ),
    }
}

pub async fn get_connections<C: Connector>(
    State(state): State<AdminState<C>>,
) -> Json<Vec<ConnectionSummary>> {
    Json(state.dispatcher.pool().connections())
}
