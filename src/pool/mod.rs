//! Connection pool subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher has a backend address
//!     → pool.rs fast path: slot entry reusable? return it
//!     → slow path: lock the address's slot, re-check, dial via Connector
//!     → entry.rs (handle + readiness state)
//!     → Dispatcher reports the call outcome back onto the entry
//! ```

pub mod entry;
#[allow(clippy::module_inception)]
pub mod pool;

pub use entry::{ConnectionEntry, ReadinessState};
pub use pool::{ConnectionPool, ConnectionSummary, PooledConnection};
