//! Per-address connection reuse.
//!
//! # Responsibilities
//! - Hand out the pooled connection for an address when it is reusable
//! - Dial at most once per address under concurrent first use
//! - Replace degraded connections on the next acquisition
//!
//! # Design Decisions
//! - Per-key locking: each address owns a slot with its own dial mutex, so
//!   first dials to different addresses proceed in parallel
//! - Fast path reads the slot's entry pointer without taking the dial mutex
//! - Superseded entries are retired (`Shutdown`, no longer established) and
//!   their handles dropped once the last in-flight call releases them
//! - No background health probing or eviction

use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwapOption;
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::observability::metrics;
use crate::pool::entry::{ConnectionEntry, ReadinessState};
use crate::rpc::{ConnectError, Connector};

/// Shared pointer to a pooled connection.
pub type PooledConnection<T> = Arc<ConnectionEntry<T>>;

struct Slot<T> {
    entry: ArcSwapOption<ConnectionEntry<T>>,
    dial: Mutex<()>,
}

impl<T: Clone> Slot<T> {
    fn new() -> Self {
        Self {
            entry: ArcSwapOption::empty(),
            dial: Mutex::new(()),
        }
    }

    fn reusable(&self) -> Option<PooledConnection<T>> {
        self.entry.load_full().filter(|entry| entry.is_reusable())
    }
}

/// Admin view of one pooled connection.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionSummary {
    pub address: String,
    pub state: ReadinessState,
    pub established: bool,
}

/// At most one reusable connection per backend address.
pub struct ConnectionPool<C: Connector> {
    connector: C,
    slots: DashMap<String, Arc<Slot<C::Channel>>>,
}

impl<C: Connector> ConnectionPool<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            slots: DashMap::new(),
        }
    }

    /// Return a reusable connection for `address`, dialing if needed.
    pub async fn acquire(&self, address: &str) -> Result<PooledConnection<C::Channel>, ConnectError> {
        // Fast path: no dial lock.
        if let Some(entry) = self.slots.get(address).and_then(|slot| slot.reusable()) {
            return Ok(entry);
        }

        let slot = self
            .slots
            .entry(address.to_string())
            .or_insert_with(|| Arc::new(Slot::new()))
            .value()
            .clone();

        let _dial = slot.dial.lock().await;

        // Another caller may have dialed while we waited.
        if let Some(entry) = slot.reusable() {
            return Ok(entry);
        }

        if let Some(stale) = slot.entry.load_full() {
            tracing::info!(address = %address, state = ?stale.state(), "Re-dialing degraded connection");
            stale.retire();
        }

        let started = Instant::now();
        match self.connector.connect(address).await {
            Ok(channel) => {
                let entry = Arc::new(ConnectionEntry::established(address, channel));
                slot.entry.store(Some(entry.clone()));
                metrics::record_dial(address, true, started);
                metrics::record_pool_size(self.slots.len());
                tracing::debug!(address = %address, elapsed = ?started.elapsed(), "Backend connected");
                Ok(entry)
            }
            Err(e) => {
                metrics::record_dial(address, false, started);
                tracing::warn!(address = %address, error = %e, "Backend dial failed");
                Err(e)
            }
        }
    }

    /// Snapshot of every pooled connection, sorted by address.
    pub fn connections(&self) -> Vec<ConnectionSummary> {
        let mut summaries: Vec<ConnectionSummary> = self
            .slots
            .iter()
            .filter_map(|slot| {
                slot.value().entry.load_full().map(|entry| ConnectionSummary {
                    address: slot.key().clone(),
                    state: entry.state(),
                    established: entry.is_established(),
                })
            })
            .collect();
        summaries.sort_by(|a, b| a.address.cmp(&b.address));
        summaries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::http::uri::PathAndQuery;
    use prost_reflect::DynamicMessage;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tonic::{Request, Status};

    use crate::pool::entry::ReadinessState;
    use crate::rpc::RpcChannel;

    #[derive(Debug, Clone, PartialEq)]
    struct FakeChannel(usize);

    #[async_trait]
    impl RpcChannel for FakeChannel {
        async fn unary(
            &self,
            _request: Request<DynamicMessage>,
            _path: PathAndQuery,
            _output: &mut DynamicMessage,
        ) -> Result<(), Status> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingConnector {
        dials: AtomicUsize,
    }

    #[async_trait]
    impl Connector for CountingConnector {
        type Channel = FakeChannel;

        async fn connect(&self, address: &str) -> Result<FakeChannel, ConnectError> {
            let n = self.dials.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            if address.starts_with("down") {
                return Err(ConnectError {
                    address: address.to_string(),
                    reason: "connection refused".into(),
                });
            }
            Ok(FakeChannel(n))
        }
    }

    #[tokio::test]
    async fn test_concurrent_acquire_dials_once() {
        let pool = Arc::new(ConnectionPool::new(CountingConnector::default()));

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..16 {
            let pool = pool.clone();
            tasks.spawn(async move { pool.acquire("10.0.0.1:50051").await.unwrap().handle() });
        }

        let mut handles = Vec::new();
        while let Some(handle) = tasks.join_next().await {
            handles.push(handle.unwrap());
        }

        assert_eq!(pool.connector.dials.load(Ordering::SeqCst), 1);
        assert_eq!(handles.len(), 16);
        assert!(handles.iter().all(|h| *h == handles[0]));
    }

    #[tokio::test]
    async fn test_different_addresses_get_different_connections() {
        let pool = ConnectionPool::new(CountingConnector::default());
        let a = pool.acquire("10.0.0.1:50051").await.unwrap();
        let b = pool.acquire("10.0.0.2:50051").await.unwrap();

        assert_ne!(a.handle(), b.handle());
        assert_eq!(pool.connections().len(), 2);
    }

    #[tokio::test]
    async fn test_degraded_entry_is_redialed() {
        let pool = ConnectionPool::new(CountingConnector::default());
        let first = pool.acquire("10.0.0.1:50051").await.unwrap();
        first.mark_transient_failure();

        let second = pool.acquire("10.0.0.1:50051").await.unwrap();
        assert_eq!(pool.connector.dials.load(Ordering::SeqCst), 2);
        assert_ne!(first.handle(), second.handle());
        assert_eq!(second.state(), ReadinessState::Ready);
        assert!(second.is_established());

        // The superseded entry is retired, not left looking connectable.
        assert_eq!(first.state(), ReadinessState::Shutdown);
        assert!(!first.is_established());
        let summary = &pool.connections()[0];
        assert_eq!(summary.state, ReadinessState::Ready);
        assert!(summary.established);

        // Warm again: no further dials.
        pool.acquire("10.0.0.1:50051").await.unwrap();
        assert_eq!(pool.connector.dials.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_dial_failure_is_not_cached() {
        let pool = ConnectionPool::new(CountingConnector::default());
        let err = pool.acquire("down:1").await.unwrap_err();
        assert_eq!(err.address, "down:1");
        assert!(pool.connections().is_empty());

        assert!(pool.acquire("down:1").await.is_err());
        assert_eq!(pool.connector.dials.load(Ordering::SeqCst), 2);
    }
}
