//! Dynamic HTTP-to-gRPC gateway library.

// Core subsystems
pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod registry;
pub mod routing;
pub mod transcode;

// Backend access
pub mod discovery;
pub mod pool;
pub mod rpc;

// Cross-cutting concerns
pub mod admin;
pub mod lifecycle;
pub mod observability;

pub use config::schema::GatewayConfig;
pub use dispatch::{DispatchOptions, Dispatcher};
pub use error::GatewayError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use registry::SchemaRegistry;
