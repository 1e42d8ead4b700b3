//! Pooled connection entries.
//!
//! # Responsibilities
//! - Hold one backend connection handle
//! - Track readiness (reusable vs. must re-dial)
//!
//! # Design Decisions
//! - `established` is true from the dial until the pool supersedes the
//!   entry; a retired entry stays `Shutdown` whatever callers still holding
//!   it report afterwards
//! - `Unknown` is only the decode fallback; `Idle` is accepted as reusable
//!   but never set by the gateway itself

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use serde::Serialize;

/// Readiness of a pooled connection.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessState {
    Unknown = 0,
    Connecting = 1,
    Ready = 2,
    TransientFailure = 3,
    Idle = 4,
    Shutdown = 5,
}

impl ReadinessState {
    /// Only idle and ready connections are reused without re-dialing.
    pub fn is_reusable(self) -> bool {
        matches!(self, ReadinessState::Idle | ReadinessState::Ready)
    }
}

impl From<u8> for ReadinessState {
    fn from(val: u8) -> Self {
        match val {
            1 => ReadinessState::Connecting,
            2 => ReadinessState::Ready,
            3 => ReadinessState::TransientFailure,
            4 => ReadinessState::Idle,
            5 => ReadinessState::Shutdown,
            _ => ReadinessState::Unknown,
        }
    }
}

/// A connection to one backend address.
#[derive(Debug)]
pub struct ConnectionEntry<T> {
    address: String,
    handle: T,
    state: AtomicU8,
    /// Set by the dial, cleared when the entry is retired.
    established: AtomicBool,
}

impl<T: Clone> ConnectionEntry<T> {
    /// Wrap a freshly dialed handle.
    pub fn established(address: impl Into<String>, handle: T) -> Self {
        Self {
            address: address.into(),
            handle,
            state: AtomicU8::new(ReadinessState::Ready as u8),
            established: AtomicBool::new(true),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn handle(&self) -> T {
        self.handle.clone()
    }

    pub fn state(&self) -> ReadinessState {
        ReadinessState::from(self.state.load(Ordering::Acquire))
    }

    pub fn is_established(&self) -> bool {
        self.established.load(Ordering::Acquire)
    }

    /// True if this entry can be handed out without re-dialing.
    pub fn is_reusable(&self) -> bool {
        self.is_established() && self.state().is_reusable()
    }

    pub fn set_state(&self, state: ReadinessState) {
        if !self.is_established() {
            return;
        }
        let previous = ReadinessState::from(self.state.swap(state as u8, Ordering::AcqRel));
        if previous != state {
            tracing::debug!(address = %self.address, from = ?previous, to = ?state, "Connection state changed");
        }
    }

    /// Report a completed call.
    pub fn mark_ready(&self) {
        self.set_state(ReadinessState::Ready);
    }

    /// Report a transport-level failure; the next acquire re-dials.
    pub fn mark_transient_failure(&self) {
        self.set_state(ReadinessState::TransientFailure);
    }

    /// Take the entry out of service once a replacement is being dialed.
    pub fn retire(&self) {
        self.established.store(false, Ordering::Release);
        self.state.store(ReadinessState::Shutdown as u8, Ordering::Release);
        tracing::debug!(address = %self.address, "Connection retired");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reusable_states() {
        assert!(ReadinessState::Ready.is_reusable());
        assert!(ReadinessState::Idle.is_reusable());
        assert!(!ReadinessState::Connecting.is_reusable());
        assert!(!ReadinessState::TransientFailure.is_reusable());
        assert!(!ReadinessState::Shutdown.is_reusable());
        assert_eq!(ReadinessState::from(42), ReadinessState::Unknown);
    }

    #[test]
    fn test_entry_transitions() {
        let entry = ConnectionEntry::established("127.0.0.1:50051", 7u32);
        assert!(entry.is_reusable());
        assert_eq!(entry.handle(), 7);

        entry.mark_transient_failure();
        assert_eq!(entry.state(), ReadinessState::TransientFailure);
        assert!(!entry.is_reusable());

        entry.set_state(ReadinessState::Idle);
        assert!(entry.is_reusable());
    }

    #[test]
    fn test_retired_entry_stays_shut_down() {
        let entry = ConnectionEntry::established("127.0.0.1:50051", 7u32);
        entry.mark_transient_failure();
        entry.retire();
        assert_eq!(entry.state(), ReadinessState::Shutdown);
        assert!(!entry.is_established());

        // A late outcome report from an in-flight call does not revive it.
        entry.mark_ready();
        assert_eq!(entry.state(), ReadinessState::Shutdown);
        assert!(!entry.is_reusable());
    }
}
