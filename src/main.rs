//! gRPC Gateway
//!
//! Exposes unary gRPC methods of many backend services as plain HTTP/JSON
//! endpoints, driven entirely by `.proto` sources and route files loaded at
//! runtime.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────────────┐
//!                         │                     GATEWAY                          │
//!                         │                                                      │
//!   HTTP request          │  ┌────────┐   ┌────────────┐   ┌───────────────┐     │
//!   ──────────────────────┼─▶│  http  │──▶│ dispatcher │──▶│    routing    │     │
//!                         │  │ server │   │            │   │ (registry     │     │
//!                         │  └────────┘   └─────┬──────┘   │  snapshot)    │     │
//!                         │                     │          └───────────────┘     │
//!                         │                     ▼                                │
//!                         │              ┌─────────────┐   ┌───────────────┐     │
//!                         │              │  discovery  │──▶│ connection    │     │
//!                         │              │ static/consul│  │ pool          │     │
//!                         │              └─────────────┘   └───────┬───────┘     │
//!                         │                                        ▼             │
//!   JSON envelope         │  ┌───────────┐                 ┌───────────────┐     │
//!   ◀─────────────────────┼──│ transcode │◀────────────────│  rpc (tonic)  │◀────┼── gRPC backend
//!                         │  └───────────┘                 └───────────────┘     │
//!                         │                                                      │
//!                         │  config · observability · lifecycle · admin          │
//!                         └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use grpc_gateway::admin;
use grpc_gateway::config::{load_config, GatewayConfig};
use grpc_gateway::http::HttpServer;
use grpc_gateway::lifecycle::{signals, startup, Shutdown};
use grpc_gateway::observability::{logging, metrics};
use grpc_gateway::registry::watcher::SchemaWatcher;

#[derive(Parser)]
#[command(name = "grpc-gateway")]
#[command(about = "HTTP/JSON gateway for gRPC services", long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the proto root directory
    #[arg(long)]
    proto_root: Option<String>,

    /// Override the HTTP bind address
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };
    if let Some(root) = args.proto_root {
        config.proto.root = root;
    }
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init_tracing(&config.observability);
    tracing::info!("grpc-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        proto_root = %config.proto.root,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    let dispatcher = startup::build_dispatcher(&config, &shutdown)?;
    let registry = dispatcher.registry().clone();

    // Kept alive for the lifetime of the process.
    let _watcher = if config.proto.watch {
        Some(SchemaWatcher::new(registry.clone()).run(shutdown.subscribe())?)
    } else {
        None
    };

    tokio::spawn(signals::shutdown_on_signal(shutdown.clone()));
    tokio::spawn(signals::reload_on_hangup(registry, shutdown.clone()));

    if config.admin.enabled {
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        let router = admin::setup_admin_router(Arc::clone(&dispatcher));
        let token = shutdown.subscribe();
        tokio::spawn(async move {
            if let Err(e) = admin::serve_admin(listener, router, token).await {
                tracing::error!(error = %e, "Admin server failed");
            }
        });
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(&config, dispatcher);
    server.run(listener, shutdown.subscribe()).await?;

    shutdown.trigger();
    tracing::info!("Shutdown complete");
    Ok(())
}
