//! Request dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! HTTP request (+ forwarded metadata)
//!     → Router: logical service, route entry, method
//!     → Discovery: backend address
//!     → ConnectionPool: pooled channel
//!     → Transcoder: call payload + empty envelope
//!     → RpcChannel::unary under call token and deadline
//!     → envelope populated with data or failure
//!     → JSON response body
//! ```

pub mod dispatcher;

pub use dispatcher::{DispatchOptions, Dispatcher};
