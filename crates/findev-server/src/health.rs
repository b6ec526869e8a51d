//! Composite health of the backing stores.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::store::{StoreConnection, StoreHandles};

/// Name the cache store is reported under.
pub const CACHE_SERVICE: &str = "redis";

/// Name the relational store is reported under.
pub const STORE_SERVICE: &str = "postgres";

/// Upper bound on a single liveness probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Liveness of one service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Up,
    Down,
}

/// Aggregate status across all tracked services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Healthy,
    Unhealthy,
}

/// Health check response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    /// `healthy` iff every service is `up`.
    pub status: OverallStatus,

    /// Per-service status keyed by service name.
    pub services: BTreeMap<String, ServiceStatus>,
}

impl HealthReport {
    /// Build a report from per-service statuses.
    pub fn from_services<I, S>(services: I) -> Self
    where
        I: IntoIterator<Item = (S, ServiceStatus)>,
        S: Into<String>,
    {
        let services: BTreeMap<String, ServiceStatus> = services
            .into_iter()
            .map(|(name, status)| (name.into(), status))
            .collect();
        let status = if services.values().all(|s| *s == ServiceStatus::Up) {
            OverallStatus::Healthy
        } else {
            OverallStatus::Unhealthy
        };
        Self { status, services }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == OverallStatus::Healthy
    }

    pub fn service(&self, name: &str) -> Option<ServiceStatus> {
        self.services.get(name).copied()
    }
}

/// Probe every store and report the composite status. Never fails.
pub async fn check_health<K, R>(handles: &StoreHandles<K, R>) -> HealthReport
where
    K: StoreConnection,
    R: StoreConnection,
{
    check_health_with_timeout(handles, DEFAULT_PROBE_TIMEOUT).await
}

/// [`check_health`] with an explicit per-probe timeout.
pub async fn check_health_with_timeout<K, R>(
    handles: &StoreHandles<K, R>,
    timeout: Duration,
) -> HealthReport
where
    K: StoreConnection,
    R: StoreConnection,
{
    let (cache, store) = tokio::join!(
        handles.cache.probe(CACHE_SERVICE, timeout),
        handles.store.probe(STORE_SERVICE, timeout),
    );
    HealthReport::from_services([(CACHE_SERVICE, cache), (STORE_SERVICE, store)])
}
