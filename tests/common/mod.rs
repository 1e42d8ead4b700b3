//! Shared fixtures and mocks for integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::uri::PathAndQuery;
use axum::http::Request;
use prost_reflect::{DynamicMessage, Value};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tonic::Status;

use grpc_gateway::discovery::{Discovery, DiscoveryError};
use grpc_gateway::dispatch::{DispatchOptions, Dispatcher};
use grpc_gateway::registry::SchemaRegistry;
use grpc_gateway::rpc::{ConnectError, Connector, RpcChannel};

pub const BACKEND: &str = "10.0.0.7:50051";

pub const ORDER_PROTO: &str = r#"
syntax = "proto3";
package order;

service OrderService {
  rpc GetOrder(GetOrderRequest) returns (OrderReply);
  rpc CreateOrder(CreateOrderRequest) returns (OrderReply);
}

message GetOrderRequest {
  int32 id = 1;
}

message CreateOrderRequest {
  string item = 1;
  int64 quantity = 2;
  bool express = 3;
}

message OrderReply {
  int32 id = 1;
  string item = 2;
}
"#;

pub const ORDER_ROUTES: &str = r#"
services:
  OrderService:
    /get: [GET, GetOrder]
    /create: [POST, CreateOrder]
    /missing: [GET, NoSuchMethod]
  GhostService:
    /ghost: [GET, Anything]
"#;

/// Write `<root>/<name>/<name>.proto` and its route file.
pub fn write_service(root: &Path, name: &str, proto: &str, routes: &str) {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(format!("{name}.proto")), proto).unwrap();
    fs::write(dir.join("router.yaml"), routes).unwrap();
}

/// A proto root holding the `order` service, loaded into a registry.
pub fn order_registry() -> (TempDir, Arc<SchemaRegistry>) {
    let dir = tempfile::tempdir().unwrap();
    write_service(dir.path(), "order", ORDER_PROTO, ORDER_ROUTES);
    let registry = SchemaRegistry::new(dir.path(), "router.yaml");
    registry.reload_all().unwrap();
    (dir, Arc::new(registry))
}

pub type Behavior = Arc<dyn Fn(&DynamicMessage, &mut DynamicMessage) -> Result<(), Status> + Send + Sync>;

/// Echo `id` back and derive `item` from it.
pub fn echo() -> Behavior {
    Arc::new(|input, output| {
        let id = input
            .get_field_by_name("id")
            .and_then(|v| v.as_i32())
            .unwrap_or(0);
        let item = input
            .get_field_by_name("item")
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| format!("widget-{id}"));
        output.set_field_by_name("id", Value::I32(id));
        output.set_field_by_name("item", Value::String(item));
        Ok(())
    })
}

pub fn failing(status: Status) -> Behavior {
    Arc::new(move |_, _| Err(status.clone()))
}

/// Everything the mock backend observed.
#[derive(Default)]
pub struct Calls {
    pub dials: AtomicUsize,
    pub invocations: AtomicUsize,
    pub inputs: Mutex<Vec<DynamicMessage>>,
    pub paths: Mutex<Vec<String>>,
    pub metadata: Mutex<Vec<HashMap<String, String>>>,
}

impl Calls {
    pub fn dials(&self) -> usize {
        self.dials.load(Ordering::SeqCst)
    }

    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    pub fn last_input(&self) -> DynamicMessage {
        self.inputs.lock().unwrap().last().cloned().unwrap()
    }
}

#[derive(Clone)]
pub struct MockChannel {
    calls: Arc<Calls>,
    behavior: Behavior,
    call_delay: Duration,
}

#[async_trait]
impl RpcChannel for MockChannel {
    async fn unary(
        &self,
        request: tonic::Request<DynamicMessage>,
        path: PathAndQuery,
        output: &mut DynamicMessage,
    ) -> Result<(), Status> {
        self.calls.invocations.fetch_add(1, Ordering::SeqCst);
        self.calls.paths.lock().unwrap().push(path.to_string());
        let metadata = request
            .metadata()
            .clone()
            .into_headers()
            .iter()
            .filter_map(|(k, v)| Some((k.to_string(), v.to_str().ok()?.to_string())))
            .collect();
        self.calls.metadata.lock().unwrap().push(metadata);

        if !self.call_delay.is_zero() {
            tokio::time::sleep(self.call_delay).await;
        }

        let input = request.into_inner();
        self.calls.inputs.lock().unwrap().push(input.clone());
        (self.behavior)(&input, output)
    }
}

/// Connector handing out mock channels; counts dials.
pub struct MockConnector {
    pub calls: Arc<Calls>,
    behavior: Mutex<Behavior>,
    dial_delay: Duration,
    call_delay: Duration,
    refuse: bool,
}

impl MockConnector {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            calls: Arc::new(Calls::default()),
            behavior: Mutex::new(behavior),
            dial_delay: Duration::ZERO,
            call_delay: Duration::ZERO,
            refuse: false,
        }
    }

    pub fn with_dial_delay(mut self, delay: Duration) -> Self {
        self.dial_delay = delay;
        self
    }

    pub fn with_call_delay(mut self, delay: Duration) -> Self {
        self.call_delay = delay;
        self
    }

    pub fn refusing(mut self) -> Self {
        self.refuse = true;
        self
    }

    /// Behavior for channels dialed from now on.
    pub fn set_behavior(&self, behavior: Behavior) {
        *self.behavior.lock().unwrap() = behavior;
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Channel = MockChannel;

    async fn connect(&self, address: &str) -> Result<MockChannel, ConnectError> {
        self.calls.dials.fetch_add(1, Ordering::SeqCst);
        if !self.dial_delay.is_zero() {
            tokio::time::sleep(self.dial_delay).await;
        }
        if self.refuse {
            return Err(ConnectError {
                address: address.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        Ok(MockChannel {
            calls: self.calls.clone(),
            behavior: self.behavior.lock().unwrap().clone(),
            call_delay: self.call_delay,
        })
    }
}

/// Discovery returning a fixed address (or none); counts lookups.
pub struct MockDiscovery {
    pub lookups: AtomicUsize,
    address: Option<String>,
}

impl MockDiscovery {
    pub fn fixed(address: &str) -> Arc<Self> {
        Arc::new(Self {
            lookups: AtomicUsize::new(0),
            address: Some(address.to_string()),
        })
    }

    pub fn empty() -> Arc<Self> {
        Arc::new(Self {
            lookups: AtomicUsize::new(0),
            address: None,
        })
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Discovery for MockDiscovery {
    async fn resolve(&self, service: &str) -> Result<String, DiscoveryError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.address
            .clone()
            .ok_or_else(|| DiscoveryError::NoInstances(service.to_string()))
    }
}

/// A dispatcher over the `order` fixture with mock backend access.
pub struct Harness {
    pub _dir: TempDir,
    pub dispatcher: Arc<Dispatcher<MockConnector>>,
    pub calls: Arc<Calls>,
    pub discovery: Arc<MockDiscovery>,
    pub shutdown: CancellationToken,
}

impl Harness {
    pub fn new(connector: MockConnector) -> Self {
        Self::with(connector, MockDiscovery::fixed(BACKEND), DispatchOptions::default())
    }

    pub fn with(
        connector: MockConnector,
        discovery: Arc<MockDiscovery>,
        options: DispatchOptions,
    ) -> Self {
        let (dir, registry) = order_registry();
        let calls = connector.calls.clone();
        let shutdown = CancellationToken::new();
        let dispatcher = Arc::new(Dispatcher::new(
            registry,
            discovery.clone(),
            connector,
            options,
            shutdown.child_token(),
        ));
        Self {
            _dir: dir,
            dispatcher,
            calls,
            discovery,
            shutdown,
        }
    }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap()
}

pub fn post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}
