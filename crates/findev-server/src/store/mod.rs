//! Backing store connections.
//!
//! Each store is reached through a [`Connector`] that produces a
//! [`StoreConnection`]. Bootstrap wraps the outcome in a
//! [`DependencyHandle`]: either a live connection or the `Unavailable`
//! sentinel that consumers must check before use.

mod mock;
mod postgres_store;
mod redis_cache;

pub use mock::{MockConnector, MockStore};
pub use postgres_store::{PostgresConnector, PostgresStore};
pub use redis_cache::{RedisCache, RedisConnector};

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::health::ServiceStatus;

/// A live connection to a backing store.
#[async_trait]
pub trait StoreConnection: Send + Sync + 'static {
    /// Lightweight liveness check.
    async fn probe(&self) -> StoreResult<()>;

    /// Release the connection. Closing more than once is a no-op.
    async fn close(&self) -> StoreResult<()>;
}

/// Opens connections to one backing store.
#[async_trait]
pub trait Connector: Send + Sync {
    type Connection: StoreConnection;

    /// Service name used in logs and health reports.
    fn service(&self) -> &'static str;

    /// Human-readable target, e.g. `host:port`.
    fn endpoint(&self) -> String;

    /// Make a single connection attempt.
    async fn connect(&self) -> StoreResult<Self::Connection>;
}

/// Either a live store connection or the "unavailable" sentinel.
#[derive(Debug)]
pub enum DependencyHandle<C> {
    /// Connected at startup.
    Live(C),

    /// Could not be reached at startup. `reason` is kept for diagnostics only.
    Unavailable { reason: String },
}

impl<C: StoreConnection> DependencyHandle<C> {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// The live connection, if the store was reached.
    pub fn get(&self) -> Option<&C> {
        match self {
            Self::Live(conn) => Some(conn),
            Self::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Live(_))
    }

    /// Why the store is unavailable, if it is.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Live(_) => None,
            Self::Unavailable { reason } => Some(reason),
        }
    }

    /// Probe the store. Unavailable handles report down without probing.
    pub async fn probe(&self, service: &'static str, timeout: Duration) -> ServiceStatus {
        let Self::Live(conn) = self else {
            return ServiceStatus::Down;
        };

        let result = match tokio::time::timeout(timeout, conn.probe()).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout { service, timeout }),
        };

        match result {
            Ok(()) => ServiceStatus::Up,
            Err(e) => {
                debug!(service, error = %e, "Health probe failed");
                ServiceStatus::Down
            }
        }
    }

    /// Close the connection, logging and discarding any failure.
    pub async fn close(&self, service: &'static str) {
        let Self::Live(conn) = self else {
            return;
        };
        match conn.close().await {
            Ok(()) => info!(service, "Connection closed"),
            Err(e) => warn!(service, error = %e, "Failed to close connection"),
        }
    }
}

/// The process-wide store handles produced by bootstrap.
#[derive(Debug)]
pub struct StoreHandles<K = RedisCache, R = PostgresStore> {
    /// Cache store (Redis).
    pub cache: DependencyHandle<K>,

    /// Relational store (PostgreSQL).
    pub store: DependencyHandle<R>,
}

impl<K: StoreConnection, R: StoreConnection> StoreHandles<K, R> {
    pub fn new(cache: DependencyHandle<K>, store: DependencyHandle<R>) -> Self {
        Self { cache, store }
    }

    /// Close every live handle. Each close runs independently; failures are
    /// logged and never propagated.
    pub async fn shutdown(&self) {
        tokio::join!(
            self.cache.close(crate::health::CACHE_SERVICE),
            self.store.close(crate::health::STORE_SERVICE),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unavailable_reports_down_without_probe() {
        let handle: DependencyHandle<MockStore> = DependencyHandle::unavailable("refused");

        assert!(!handle.is_available());
        assert_eq!(handle.reason(), Some("refused"));
        assert!(handle.get().is_none());
        assert_eq!(
            handle.probe("redis", Duration::from_secs(1)).await,
            ServiceStatus::Down
        );
    }

    #[tokio::test]
    async fn test_probe_failure_is_contained() {
        let store = MockStore::new();
        let probes = store.probe_counter();
        let handle = DependencyHandle::Live(store);

        assert_eq!(
            handle.probe("postgres", Duration::from_secs(1)).await,
            ServiceStatus::Up
        );

        handle.get().unwrap().set_healthy(false);
        assert_eq!(
            handle.probe("postgres", Duration::from_secs(1)).await,
            ServiceStatus::Down
        );
        assert_eq!(probes.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_hung_probe_times_out() {
        let handle = DependencyHandle::Live(MockStore::new().with_probe_delay(Duration::from_secs(5)));

        let status = handle.probe("redis", Duration::from_millis(20)).await;
        assert_eq!(status, ServiceStatus::Down);
    }

    #[tokio::test]
    async fn test_shutdown_closes_both_despite_failure() {
        let cache = MockStore::new().with_failing_close();
        let store = MockStore::new();
        let cache_closes = cache.close_counter();
        let store_closes = store.close_counter();

        let handles = StoreHandles::new(DependencyHandle::Live(cache), DependencyHandle::Live(store));
        handles.shutdown().await;

        use std::sync::atomic::Ordering;
        assert_eq!(cache_closes.load(Ordering::SeqCst), 1);
        assert_eq!(store_closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shutdown_skips_unavailable() {
        let store = MockStore::new();
        let closes = store.close_counter();
        let handles: StoreHandles<MockStore, MockStore> = StoreHandles::new(
            DependencyHandle::unavailable("never connected"),
            DependencyHandle::Live(store),
        );

        handles.shutdown().await;
        assert_eq!(closes.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
