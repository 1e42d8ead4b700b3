//! Transcoding subsystem.
//!
//! # Data Flow
//! ```text
//! HTTP request (query string or JSON body)
//!     → request.rs (type-directed coercion, proto3 JSON decode)
//!     → DynamicMessage (call payload)
//!
//! Invocation result
//!     → envelope.rs ({code, message, data} wrapper)
//!     → JSON response body
//! ```

pub mod envelope;
pub mod request;

pub use envelope::{build_envelope, INVOCATION_FAILED};
pub use request::build_request;
