//! Building a service descriptor from its directory.
//!
//! # Responsibilities
//! - List the `.proto` sources of one service directory (non-recursive)
//! - Compile them into a descriptor pool
//! - Define envelope schemas for every unary method's output type
//! - Attach the service's route table
//!
//! # Design Decisions
//! - Fail fast: any read, compile or route error aborts the whole service
//! - Everything is resolved from the final pool (after envelopes are added)

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use prost_reflect::{DescriptorPool, MessageDescriptor};

use crate::config::ConfigError;
use crate::registry::descriptor::{MethodDescriptor, ServiceDescriptor, SubServiceDescriptor};
use crate::routing::table::parse_routes;
use crate::transcode::envelope::{define_envelopes, envelope_name};

const PROTO_EXTENSION: &str = "proto";

/// Names of the `.proto` files directly inside `dir`, sorted.
pub fn proto_files(dir: &Path) -> Result<Vec<String>, ConfigError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| ConfigError::io(dir, e))? {
        let entry = entry.map_err(|e| ConfigError::io(dir, e))?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == PROTO_EXTENSION) {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                files.push(name.to_string());
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Sub-directories of `root`, sorted; each one is a logical service.
pub fn service_dirs(root: &Path) -> Result<Vec<String>, ConfigError> {
    let mut names = Vec::new();
    for entry in fs::read_dir(root).map_err(|e| ConfigError::io(root, e))? {
        let entry = entry.map_err(|e| ConfigError::io(root, e))?;
        if entry.path().is_dir() {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

fn compile(service: &str, import_path: &Path, files: &[String]) -> Result<DescriptorPool, ConfigError> {
    let schema_error = |e: protox::Error| ConfigError::Schema {
        service: service.to_string(),
        message: e.to_string(),
    };
    let mut compiler = protox::Compiler::new([import_path]).map_err(schema_error)?;
    compiler.open_files(files).map_err(schema_error)?;
    Ok(compiler.descriptor_pool())
}

/// Output types of every unary method in `pool`, deduplicated by name.
fn unary_outputs(pool: &DescriptorPool) -> Vec<MessageDescriptor> {
    let mut outputs = BTreeMap::new();
    for service in pool.services() {
        for method in service.methods() {
            if !method.is_client_streaming() && !method.is_server_streaming() {
                let output = method.output();
                outputs.insert(output.full_name().to_string(), output);
            }
        }
    }
    outputs.into_values().collect()
}

fn sub_services(
    service: &str,
    pool: &DescriptorPool,
) -> Result<HashMap<String, SubServiceDescriptor>, ConfigError> {
    let mut sub_services = HashMap::new();

    for proto_service in pool.services() {
        let mut sub_service = SubServiceDescriptor {
            name: proto_service.name().to_string(),
            methods: HashMap::new(),
        };

        for method in proto_service.methods() {
            if method.is_client_streaming() || method.is_server_streaming() {
                tracing::debug!(
                    service = %service,
                    method = %method.full_name(),
                    "Skipping streaming method"
                );
                continue;
            }

            let name = envelope_name(&method.output());
            let envelope = pool
                .get_message_by_name(&name)
                .ok_or_else(|| ConfigError::Schema {
                    service: service.to_string(),
                    message: format!("missing envelope {name}"),
                })?;

            sub_service.methods.insert(
                method.name().to_string(),
                Arc::new(MethodDescriptor::new(
                    method.name(),
                    proto_service.name(),
                    method.input(),
                    method.output(),
                    envelope,
                )),
            );
        }

        sub_services.insert(sub_service.name.clone(), sub_service);
    }

    Ok(sub_services)
}

fn is_service_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Build the complete descriptor for `service` under `root`.
pub fn load_service(root: &Path, routes_file: &str, service: &str) -> Result<ServiceDescriptor, ConfigError> {
    if !is_service_name(service) {
        return Err(ConfigError::InvalidServiceName(service.to_string()));
    }
    let import_path: PathBuf = root.join(service);

    let files = proto_files(&import_path)?;
    if files.is_empty() {
        return Err(ConfigError::NoProtoFiles(service.to_string()));
    }

    let mut pool = compile(service, &import_path, &files)?;
    let outputs = unary_outputs(&pool);
    define_envelopes(&mut pool, service, &outputs).map_err(|message| {
        ConfigError::Schema {
            service: service.to_string(),
            message,
        }
    })?;
    let sub_services = sub_services(service, &pool)?;

    let routes_path = import_path.join(routes_file);
    let source = fs::read_to_string(&routes_path).map_err(|e| ConfigError::io(&routes_path, e))?;
    let routes = parse_routes(&source).map_err(|message| ConfigError::Routes {
        service: service.to_string(),
        message,
    })?;

    tracing::debug!(
        service = %service,
        files = files.len(),
        sub_services = sub_services.len(),
        routes = routes.len(),
        "Service schema loaded"
    );

    Ok(ServiceDescriptor {
        name: service.to_string(),
        import_path,
        sub_services,
        routes,
    })
}
