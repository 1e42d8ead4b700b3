//! Backend connections and unary invocation.
//!
//! # Responsibilities
//! - Dial a backend address (`Connector`)
//! - Invoke a unary method on an established connection (`RpcChannel`)
//!
//! # Design Decisions
//! - Plaintext HTTP/2; no transport security
//! - Dials eagerly so an unreachable backend is reported at acquisition
//! - Traits at this seam keep the pool and dispatcher testable without a network

use std::time::Duration;

use async_trait::async_trait;
use axum::http::uri::PathAndQuery;
use prost_reflect::{DynamicMessage, ReflectMessage};
use thiserror::Error;
use tonic::transport::{Channel, Endpoint};
use tonic::{Request, Status};

use crate::rpc::codec::DynamicCodec;

/// Dial failure for a backend address.
#[derive(Debug, Clone, Error)]
#[error("failed to connect to {address}: {reason}")]
pub struct ConnectError {
    pub address: String,
    pub reason: String,
}

/// An established, cloneable connection to one backend.
#[async_trait]
pub trait RpcChannel: Clone + Send + Sync + 'static {
    /// Invoke `path` with `request`, writing the response into `output`.
    async fn unary(
        &self,
        request: Request<DynamicMessage>,
        path: PathAndQuery,
        output: &mut DynamicMessage,
    ) -> Result<(), Status>;
}

/// Creates connections to backend addresses.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Channel: RpcChannel;

    async fn connect(&self, address: &str) -> Result<Self::Channel, ConnectError>;
}

/// Dials backends with `tonic`.
#[derive(Debug, Clone)]
pub struct GrpcConnector {
    connect_timeout: Duration,
}

impl GrpcConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl Connector for GrpcConnector {
    type Channel = GrpcChannel;

    async fn connect(&self, address: &str) -> Result<GrpcChannel, ConnectError> {
        let error = |reason: String| ConnectError {
            address: address.to_string(),
            reason,
        };

        let endpoint = Endpoint::from_shared(format!("http://{address}"))
            .map_err(|e| error(e.to_string()))?
            .connect_timeout(self.connect_timeout);
        let channel = endpoint.connect().await.map_err(|e| error(e.to_string()))?;

        Ok(GrpcChannel { inner: channel })
    }
}

/// A `tonic` channel speaking dynamic messages.
#[derive(Debug, Clone)]
pub struct GrpcChannel {
    inner: Channel,
}

#[async_trait]
impl RpcChannel for GrpcChannel {
    async fn unary(
        &self,
        request: Request<DynamicMessage>,
        path: PathAndQuery,
        output: &mut DynamicMessage,
    ) -> Result<(), Status> {
        let mut grpc = tonic::client::Grpc::new(self.inner.clone());
        grpc.ready()
            .await
            .map_err(|e| Status::unavailable(format!("service was not ready: {e}")))?;

        let codec = DynamicCodec::new(output.descriptor());
        let response = grpc.unary(request, path, codec).await?;
        *output = response.into_inner();
        Ok(())
    }
}
