//! Schema registry subsystem.
//!
//! # Data Flow
//! ```text
//! <root>/<service>/*.proto + router.yaml
//!     → loader.rs (compile sources, define envelopes, attach routes)
//!     → ServiceDescriptor (immutable)
//!     → RegistrySnapshot (name → Arc<ServiceDescriptor>)
//!     → ArcSwap: readers load the current snapshot lock-free
//!
//! On reload (admin call, SIGHUP, watcher.rs):
//!     build every service off to the side
//!     → all loaded: swap the whole snapshot
//!     → any failure: keep the live snapshot, report the error
//! ```
//!
//! # Design Decisions
//! - Readers never observe a half-built service
//! - Reload is all-or-nothing across services
//! - Route entries are bound to methods lazily, at dispatch

pub mod descriptor;
pub mod loader;
pub mod watcher;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;

use crate::config::{ConfigError, ProtoConfig};
use crate::error::GatewayError;
use crate::observability::metrics;

pub use descriptor::{
    FieldDescriptor, MethodDescriptor, ScalarType, ServiceDescriptor, SubServiceDescriptor,
};

/// An immutable view of every loaded service.
#[derive(Debug, Default)]
pub struct RegistrySnapshot {
    pub version: u64,
    pub services: HashMap<String, Arc<ServiceDescriptor>>,
}

/// Runtime registry of service schemas and route tables.
#[derive(Debug)]
pub struct SchemaRegistry {
    root: PathBuf,
    routes_file: String,
    snapshot: ArcSwap<RegistrySnapshot>,
    /// Serializes writers; readers never take it.
    reload_lock: Mutex<()>,
}

impl SchemaRegistry {
    /// Create an empty registry over `root`.
    pub fn new(root: impl Into<PathBuf>, routes_file: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            routes_file: routes_file.into(),
            snapshot: ArcSwap::from_pointee(RegistrySnapshot::default()),
            reload_lock: Mutex::new(()),
        }
    }

    /// Create a registry and load every service; fails if none load.
    pub fn open(config: &ProtoConfig) -> Result<Self, ConfigError> {
        let registry = Self::new(&config.root, &config.routes_file);
        let loaded = registry.reload_all()?;
        if loaded.is_empty() {
            return Err(ConfigError::NoServices(registry.root.clone()));
        }
        tracing::info!(services = ?loaded, "Schema registry ready");
        Ok(registry)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load (or replace) a single service.
    pub fn load(&self, name: &str) -> Result<Arc<ServiceDescriptor>, ConfigError> {
        let _guard = self.reload_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let descriptor = Arc::new(loader::load_service(&self.root, &self.routes_file, name)?);
        self.snapshot.rcu(|current| {
            let mut services = current.services.clone();
            services.insert(name.to_string(), descriptor.clone());
            Arc::new(RegistrySnapshot {
                version: current.version + 1,
                services,
            })
        });

        tracing::info!(service = %name, "Service loaded");
        Ok(descriptor)
    }

    /// Reload every service directory under the root.
    ///
    /// The live snapshot is replaced only when every service loads.
    pub fn reload_all(&self) -> Result<Vec<String>, ConfigError> {
        let _guard = self.reload_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let result = self.build_all();
        metrics::record_registry_reload(result.is_ok());
        let services = result?;

        let mut names: Vec<String> = services.keys().cloned().collect();
        names.sort();

        let version = self.snapshot.load().version + 1;
        self.snapshot.store(Arc::new(RegistrySnapshot { version, services }));

        tracing::info!(version, services = names.len(), "Schema registry reloaded");
        Ok(names)
    }

    fn build_all(&self) -> Result<HashMap<String, Arc<ServiceDescriptor>>, ConfigError> {
        let mut services = HashMap::new();
        for name in loader::service_dirs(&self.root)? {
            let descriptor = loader::load_service(&self.root, &self.routes_file, &name)
                .inspect_err(|e| tracing::error!(service = %name, error = %e, "Service load failed"))?;
            services.insert(name, Arc::new(descriptor));
        }
        Ok(services)
    }

    /// Look up a service by logical name.
    pub fn lookup(&self, name: &str) -> Result<Arc<ServiceDescriptor>, GatewayError> {
        self.snapshot
            .load()
            .services
            .get(name)
            .cloned()
            .ok_or_else(|| GatewayError::ServiceNotFound(name.to_string()))
    }

    /// Loaded service names, sorted.
    pub fn services(&self) -> Vec<String> {
        let mut names: Vec<String> = self.snapshot.load().services.keys().cloned().collect();
        names.sort();
        names
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.snapshot.load_full()
    }
}
