//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware: request ID, trace, timeout, body limit)
//!     → request.rs (forwarded headers → call metadata)
//!     → Dispatcher (route, discover, invoke)
//!     → envelope JSON, or response.rs (GatewayError → status + text)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{outgoing_metadata, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
