//! Startup connection to the backing stores.
//!
//! The two stores get different policies:
//! - The cache store gets a single bounded attempt followed by a bounded `PING`.
//! - The relational store gets a bounded retry loop with a fixed delay.
//!
//! Neither failure stops the process. A store that cannot be reached ends up
//! as [`DependencyHandle::Unavailable`] and the service runs degraded.

use std::time::Duration;

use tracing::{info, warn};

use crate::config::{PostgresConfig, ServiceConfig};
use crate::error::{StoreError, StoreResult};
use crate::store::{
    Connector, DependencyHandle, PostgresConnector, RedisConnector, StoreConnection, StoreHandles,
};

/// Bounded retry with a fixed delay between failed attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,

    /// Pause after each failed attempt (not after the last).
    pub delay: Duration,

    /// Bound on each individual attempt.
    pub connect_timeout: Duration,
}

impl RetryPolicy {
    /// A single attempt bounded by `connect_timeout`.
    pub fn once(connect_timeout: Duration) -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::ZERO,
            connect_timeout,
        }
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&PostgresConfig::default())
    }
}

impl From<&PostgresConfig> for RetryPolicy {
    fn from(config: &PostgresConfig) -> Self {
        Self {
            max_attempts: config.max_retries,
            delay: config.retry_delay(),
            connect_timeout: config.connect_timeout(),
        }
    }
}

/// Connect to Redis and PostgreSQL using `config`.
pub async fn bootstrap(config: &ServiceConfig) -> StoreHandles {
    bootstrap_with(
        &RedisConnector::new(config.redis.clone()),
        config.redis.connect_timeout(),
        &PostgresConnector::new(config.postgres.clone()),
        &RetryPolicy::from(&config.postgres),
    )
    .await
}

/// Connect both stores with the given connectors. Never fails.
pub async fn bootstrap_with<K, R>(
    cache: &K,
    cache_timeout: Duration,
    store: &R,
    store_policy: &RetryPolicy,
) -> StoreHandles<K::Connection, R::Connection>
where
    K: Connector,
    R: Connector,
{
    let cache = connect_cache(cache, cache_timeout).await;
    let store = connect_store(store, store_policy).await;

    info!(
        cache = if cache.is_available() { "up" } else { "unavailable" },
        store = if store.is_available() { "up" } else { "unavailable" },
        "Dependency bootstrap complete"
    );

    StoreHandles::new(cache, store)
}

/// One attempt plus a liveness probe; any failure yields an unavailable handle.
pub async fn connect_cache<C: Connector>(
    connector: &C,
    timeout: Duration,
) -> DependencyHandle<C::Connection> {
    let service = connector.service();

    let result = match attempt(connector, timeout).await {
        Ok(conn) => match probe(&conn, service, timeout).await {
            Ok(()) => Ok(conn),
            Err(e) => {
                // Release whatever the failed connection holds.
                if let Err(close_err) = conn.close().await {
                    warn!(service, error = %close_err, "Failed to close unverified connection");
                }
                Err(e)
            }
        },
        Err(e) => Err(e),
    };

    match result {
        Ok(conn) => {
            info!(service, endpoint = %connector.endpoint(), "Connected");
            DependencyHandle::Live(conn)
        }
        Err(e) => {
            warn!(
                service,
                endpoint = %connector.endpoint(),
                error = %e,
                "Connection failed, continuing without it"
            );
            DependencyHandle::unavailable(e.to_string())
        }
    }
}

/// Retry per `policy`; exhaustion yields an unavailable handle carrying the
/// last error as its reason.
pub async fn connect_store<C: Connector>(
    connector: &C,
    policy: &RetryPolicy,
) -> DependencyHandle<C::Connection> {
    let service = connector.service();

    match connect_with_retry(connector, policy).await {
        Ok(conn) => {
            info!(service, endpoint = %connector.endpoint(), "Connected");
            DependencyHandle::Live(conn)
        }
        Err(e) => {
            warn!(
                service,
                endpoint = %connector.endpoint(),
                attempts = policy.attempts(),
                error = %e,
                "Giving up, continuing without it"
            );
            DependencyHandle::unavailable(format!(
                "{} attempts failed, last error: {e}",
                policy.attempts()
            ))
        }
    }
}

/// Execute connect attempts until one succeeds or the policy is exhausted.
pub async fn connect_with_retry<C: Connector>(
    connector: &C,
    policy: &RetryPolicy,
) -> StoreResult<C::Connection> {
    let service = connector.service();
    let max_attempts = policy.attempts();
    let mut attempt_no = 1;

    loop {
        match attempt(connector, policy.connect_timeout).await {
            Ok(conn) => return Ok(conn),
            Err(e) if attempt_no >= max_attempts => return Err(e),
            Err(e) => {
                warn!(
                    service,
                    attempt = attempt_no,
                    max_attempts,
                    delay_ms = policy.delay.as_millis() as u64,
                    error = %e,
                    "Connection attempt failed, retrying"
                );
                tokio::time::sleep(policy.delay).await;
                attempt_no += 1;
            }
        }
    }
}

async fn attempt<C: Connector>(connector: &C, timeout: Duration) -> StoreResult<C::Connection> {
    match tokio::time::timeout(timeout, connector.connect()).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout {
            service: connector.service(),
            timeout,
        }),
    }
}

async fn probe<S: StoreConnection>(
    conn: &S,
    service: &'static str,
    timeout: Duration,
) -> StoreResult<()> {
    match tokio::time::timeout(timeout, conn.probe()).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout { service, timeout }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MockConnector;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            delay: Duration::from_millis(1),
            connect_timeout: Duration::from_millis(200),
        }
    }

    #[test]
    fn test_policy_from_config() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 10);
        assert_eq!(policy.delay, Duration::from_secs(2));
        assert_eq!(policy.connect_timeout, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_store_retries_until_success() {
        let connector = MockConnector::new("postgres").failing_times(2);

        let handle = connect_store(&connector, &fast_policy(5)).await;

        assert!(handle.is_available());
        assert_eq!(connector.attempts(), 3);
    }

    #[tokio::test]
    async fn test_store_exhaustion_degrades() {
        let connector = MockConnector::unreachable("postgres");

        let handle = connect_store(&connector, &fast_policy(4)).await;

        assert!(!handle.is_available());
        assert_eq!(connector.attempts(), 4);
        let reason = handle.reason().unwrap();
        assert!(reason.contains("4 attempts failed"));
        assert!(reason.contains("attempt 4"));
    }

    #[tokio::test]
    async fn test_zero_attempts_still_tries_once() {
        let connector = MockConnector::unreachable("postgres");

        let handle = connect_store(&connector, &fast_policy(0)).await;

        assert!(!handle.is_available());
        assert_eq!(connector.attempts(), 1);
    }

    #[tokio::test]
    async fn test_attempt_times_out() {
        let connector = MockConnector::new("postgres").with_connect_delay(Duration::from_secs(5));
        let policy = RetryPolicy {
            max_attempts: 2,
            delay: Duration::from_millis(1),
            connect_timeout: Duration::from_millis(20),
        };

        let handle = connect_store(&connector, &policy).await;

        assert!(!handle.is_available());
        assert_eq!(connector.attempts(), 2);
        assert!(handle.reason().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_cache_single_attempt_only() {
        let connector = MockConnector::new("redis").failing_times(1);

        let handle = connect_cache(&connector, Duration::from_millis(200)).await;

        assert!(!handle.is_available());
        assert_eq!(connector.attempts(), 1);
    }

    #[tokio::test]
    async fn test_cache_probe_failure_degrades() {
        let connector = MockConnector::new("redis").with_unhealthy_store();

        let handle = connect_cache(&connector, Duration::from_millis(200)).await;

        assert!(!handle.is_available());
        assert!(handle.reason().unwrap().contains("unhealthy"));
    }

    #[tokio::test]
    async fn test_cache_hung_ping_degrades() {
        let connector =
            MockConnector::new("redis").with_store_probe_delay(Duration::from_secs(3600));

        let handle = tokio::time::timeout(
            Duration::from_secs(2),
            connect_cache(&connector, Duration::from_millis(100)),
        )
        .await
        .expect("cache bootstrap must not wait on an unanswered PING");

        assert!(!handle.is_available());
        assert!(handle.reason().unwrap().contains("timed out"));
        assert_eq!(connector.attempts(), 1);
    }

    #[tokio::test]
    async fn test_cache_probe_failure_survives_close_error() {
        let connector = MockConnector::new("redis")
            .with_unhealthy_store()
            .with_failing_store_close();

        let handle = connect_cache(&connector, Duration::from_millis(200)).await;

        assert!(!handle.is_available());
        assert!(handle.reason().unwrap().contains("unhealthy"));
    }

    #[tokio::test]
    async fn test_bootstrap_partial_failure() {
        let cache = MockConnector::new("redis");
        let store = MockConnector::unreachable("postgres");

        let handles =
            bootstrap_with(&cache, Duration::from_millis(200), &store, &fast_policy(3)).await;

        assert!(handles.cache.is_available());
        assert!(!handles.store.is_available());
        assert_eq!(cache.attempts(), 1);
        assert_eq!(store.attempts(), 3);
    }

    #[tokio::test]
    async fn test_bootstrap_all_unreachable_completes() {
        let cache = MockConnector::unreachable("redis");
        let store = MockConnector::unreachable("postgres");

        let handles =
            bootstrap_with(&cache, Duration::from_millis(200), &store, &fast_policy(2)).await;

        assert!(!handles.cache.is_available());
        assert!(!handles.store.is_available());
        assert_eq!(cache.attempts(), 1);
        assert_eq!(store.attempts(), 2);
    }
}
