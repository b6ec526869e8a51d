//! In-memory stand-ins for the backing stores.
//!
//! Useful for deterministic testing of bootstrap, health, and shutdown
//! without a running Redis or PostgreSQL.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::{Connector, StoreConnection};
use crate::error::{StoreError, StoreResult};

/// A connector whose attempts fail a configurable number of times.
#[derive(Debug)]
pub struct MockConnector {
    service: &'static str,
    failures: usize,
    connect_delay: Duration,
    healthy: bool,
    store_probe_delay: Duration,
    store_close_fails: bool,
    attempts: Arc<AtomicUsize>,
}

impl MockConnector {
    /// A connector that succeeds on the first attempt.
    pub fn new(service: &'static str) -> Self {
        Self {
            service,
            failures: 0,
            connect_delay: Duration::ZERO,
            healthy: true,
            store_probe_delay: Duration::ZERO,
            store_close_fails: false,
            attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fail every attempt.
    pub fn unreachable(service: &'static str) -> Self {
        Self::new(service).failing_times(usize::MAX)
    }

    /// Fail the first `n` attempts, then succeed.
    pub fn failing_times(mut self, n: usize) -> Self {
        self.failures = n;
        self
    }

    /// Sleep before each attempt resolves.
    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    /// Connected stores fail their probes.
    pub fn with_unhealthy_store(mut self) -> Self {
        self.healthy = false;
        self
    }

    /// Connected stores sleep before answering probes.
    pub fn with_store_probe_delay(mut self, delay: Duration) -> Self {
        self.store_probe_delay = delay;
        self
    }

    /// Connected stores report an error on close.
    pub fn with_failing_store_close(mut self) -> Self {
        self.store_close_fails = true;
        self
    }

    /// Shared counter of connect attempts made so far.
    pub fn attempt_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.attempts)
    }

    /// Number of connect attempts made so far.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Connection = MockStore;

    fn service(&self) -> &'static str {
        self.service
    }

    fn endpoint(&self) -> String {
        format!("mock://{}", self.service)
    }

    async fn connect(&self) -> StoreResult<MockStore> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if !self.connect_delay.is_zero() {
            tokio::time::sleep(self.connect_delay).await;
        }
        if attempt < self.failures {
            return Err(StoreError::Other(format!(
                "{} refused connection (attempt {})",
                self.service,
                attempt + 1
            )));
        }
        let mut store = MockStore::new().with_probe_delay(self.store_probe_delay);
        if self.store_close_fails {
            store = store.with_failing_close();
        }
        store.set_healthy(self.healthy);
        Ok(store)
    }
}

/// A store whose probe and close behavior can be scripted.
#[derive(Debug)]
pub struct MockStore {
    healthy: AtomicBool,
    closed: AtomicBool,
    close_fails: bool,
    probe_delay: Duration,
    probes: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            healthy: AtomicBool::new(true),
            closed: AtomicBool::new(false),
            close_fails: false,
            probe_delay: Duration::ZERO,
            probes: Arc::new(AtomicUsize::new(0)),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Close reports an error (after counting the attempt).
    pub fn with_failing_close(mut self) -> Self {
        self.close_fails = true;
        self
    }

    /// Probes sleep before answering.
    pub fn with_probe_delay(mut self, delay: Duration) -> Self {
        self.probe_delay = delay;
        self
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Shared counter of probes received.
    pub fn probe_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.probes)
    }

    /// Shared counter of closes that actually released the store.
    pub fn close_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.closes)
    }
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoreConnection for MockStore {
    async fn probe(&self) -> StoreResult<()> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if !self.probe_delay.is_zero() {
            tokio::time::sleep(self.probe_delay).await;
        }
        if self.is_closed() {
            return Err(StoreError::Closed("mock"));
        }
        if !self.healthy.load(Ordering::SeqCst) {
            return Err(StoreError::Other("mock store unhealthy".to_string()));
        }
        Ok(())
    }

    async fn close(&self) -> StoreResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.close_fails {
            return Err(StoreError::Other("mock close failed".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_failing_times_then_succeeds() {
        let connector = MockConnector::new("postgres").failing_times(2);

        assert!(connector.connect().await.is_err());
        assert!(connector.connect().await.is_err());
        assert!(connector.connect().await.is_ok());
        assert_eq!(connector.attempts(), 3);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let store = MockStore::new();
        let closes = store.close_counter();

        store.close().await.unwrap();
        store.close().await.unwrap();

        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert!(store.probe().await.is_err());
    }
}
