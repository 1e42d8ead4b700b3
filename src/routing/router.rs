//! Route lookup and method binding.
//!
//! # Responsibilities
//! - Split a request path into logical service and route key
//! - Look up the route key in the service's route table
//! - Bind the route entry to a parsed method
//!
//! # Design Decisions
//! - Registry reads go through the current snapshot (lock-free)
//! - Explicit error per failure kind rather than a silent default
//! - Routing failures return before any discovery or network work

use std::sync::Arc;

use crate::error::GatewayError;
use crate::registry::{MethodDescriptor, SchemaRegistry, ServiceDescriptor};
use crate::routing::table::RouteEntry;

/// A request path resolved all the way to a method.
#[derive(Debug, Clone)]
pub struct ResolvedRoute {
    pub service: String,
    pub entry: RouteEntry,
    pub method: Arc<MethodDescriptor>,
}

impl ResolvedRoute {
    /// Wire path of the remote method.
    pub fn rpc_path(&self) -> String {
        format!(
            "/{}.{}/{}",
            self.service, self.entry.sub_service, self.entry.method
        )
    }
}

/// Split `path` into `(logical service, route key)`.
pub fn resolve(path: &str) -> Result<(String, String), GatewayError> {
    let trimmed = path.trim_start_matches('/');
    match trimmed.split_once('/') {
        Some((service, rest)) => Ok((service.to_string(), format!("/{rest}"))),
        None => Err(GatewayError::MalformedPath(path.to_string())),
    }
}

/// Find the route entry for `route` in `service`.
pub fn match_route<'a>(
    service: &'a ServiceDescriptor,
    route: &str,
) -> Result<&'a RouteEntry, GatewayError> {
    service
        .routes
        .get(route)
        .ok_or_else(|| GatewayError::RouteNotFound {
            service: service.name.clone(),
            route: route.to_string(),
        })
}

/// Resolve a route entry's sub-service and method against the parsed schema.
pub fn bind(
    service: &ServiceDescriptor,
    entry: &RouteEntry,
) -> Result<Arc<MethodDescriptor>, GatewayError> {
    let sub_service = service.sub_service(&entry.sub_service).ok_or_else(|| {
        GatewayError::SubServiceNotFound {
            service: service.name.clone(),
            sub_service: entry.sub_service.clone(),
        }
    })?;

    sub_service
        .methods
        .get(&entry.method)
        .cloned()
        .ok_or_else(|| GatewayError::MethodNotFound {
            service: service.name.clone(),
            sub_service: entry.sub_service.clone(),
            method: entry.method.clone(),
        })
}

/// Resolves inbound paths against the schema registry.
#[derive(Debug, Clone)]
pub struct Router {
    registry: Arc<SchemaRegistry>,
}

impl Router {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    /// Resolve → lookup → match → bind.
    pub fn route(&self, path: &str) -> Result<ResolvedRoute, GatewayError> {
        let (service_name, route) = resolve(path)?;
        let service = self.registry.lookup(&service_name)?;
        let entry = match_route(&service, &route)?;
        let method = bind(&service, entry)?;

        Ok(ResolvedRoute {
            service: service_name,
            entry: entry.clone(),
            method,
        })
    }
}
