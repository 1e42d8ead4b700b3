//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming path "/<service>/<rest>"
//!     → router.rs resolve (service, "/<rest>")
//!     → registry lookup (ServiceDescriptor)
//!     → table.rs route entry (verb, sub-service, method)
//!     → router.rs bind (MethodDescriptor)
//!
//! Route tables (at schema load):
//!     router.yaml
//!     → table.rs parse & flatten
//!     → attached to the ServiceDescriptor
//! ```
//!
//! # Design Decisions
//! - Only the two-segment "service / remaining path" pattern is supported
//! - Exact route-key lookup, no patterns
//! - Deterministic: same input always matches same route

pub mod router;
pub mod table;

pub use router::{ResolvedRoute, Router};
pub use table::{RouteEntry, RouteTable};
