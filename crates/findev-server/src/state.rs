//! Application state shared across handlers.

use std::sync::Arc;

use findev_session::{CacheConfig, SessionCache, SessionVariant};
use tracing::info;

use crate::config::ServiceConfig;
use crate::error::Result;
use crate::health::{self, HealthReport};
use crate::session_factory::{ClientSessionFactory, SharedSession};
use crate::store::{PostgresStore, RedisCache, StoreConnection, StoreHandles};

/// Application state shared across all handlers.
///
/// Generic over the store connection types so tests can run against
/// in-memory stores; production uses the defaults.
pub struct AppState<K = RedisCache, R = PostgresStore> {
    /// Service configuration.
    pub config: Arc<ServiceConfig>,

    /// Integration sessions, one per `(integration, kind)`.
    pub sessions: SessionCache<SharedSession>,

    session_factory: Arc<ClientSessionFactory>,
    stores: Arc<StoreHandles<K, R>>,
}

impl<K: StoreConnection, R: StoreConnection> AppState<K, R> {
    /// Create state around already-bootstrapped store handles.
    pub fn new(config: ServiceConfig, stores: StoreHandles<K, R>) -> Self {
        let sessions = SessionCache::new(CacheConfig::new().with_ttl(config.session.ttl()));
        let session_factory = Arc::new(ClientSessionFactory::from(&config.session));
        Self {
            config: Arc::new(config),
            sessions,
            session_factory,
            stores: Arc::new(stores),
        }
    }

    /// Get or build the client session for an integration.
    ///
    /// `use_http` and `check` shape the session only when it is built; a
    /// cached session is returned as-is.
    pub async fn session(
        &self,
        integration: &str,
        kind: &str,
        use_http: bool,
        check: Option<&str>,
    ) -> Result<SharedSession> {
        let variant = SessionVariant::from_flags(use_http, check);
        let session = self
            .sessions
            .get_or_create(integration, kind, self.session_factory.as_ref(), &variant)
            .await?;
        Ok(session)
    }

    pub fn stores(&self) -> &StoreHandles<K, R> {
        &self.stores
    }

    /// Probe every backing store.
    pub async fn check_health(&self) -> HealthReport {
        health::check_health(&self.stores).await
    }

    /// Close the backing stores. Safe to call more than once.
    pub async fn shutdown(&self) {
        info!("Closing backing stores");
        self.stores.shutdown().await;
    }
}

impl<K, R> Clone for AppState<K, R> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            sessions: self.sessions.clone(),
            session_factory: Arc::clone(&self.session_factory),
            stores: Arc::clone(&self.stores),
        }
    }
}
