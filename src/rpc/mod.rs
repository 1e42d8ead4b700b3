//! RPC transport subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher
//!     → channel.rs (Connector dials, RpcChannel invokes)
//!     → codec.rs (DynamicMessage ⇄ protobuf bytes)
//!     → backend over HTTP/2
//! ```

pub mod channel;
pub mod codec;

pub use channel::{ConnectError, Connector, GrpcChannel, GrpcConnector, RpcChannel};
pub use codec::DynamicCodec;
