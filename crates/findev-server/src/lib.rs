//! Application core for the FinDev backend.
//!
//! This crate wires the long-lived resources the HTTP layer depends on:
//!
//! # Features
//!
//! - Startup bootstrap of Redis and PostgreSQL with bounded retry
//! - Degraded operation when a store cannot be reached
//! - Composite health reporting (`GET /health`)
//! - Integration client sessions cached per `(integration, kind)`
//! - Exactly-once store shutdown
//!
//! # Example
//!
//! ```ignore
//! use findev_server::{AppState, Server, ServiceConfig, bootstrap};
//!
//! let config = ServiceConfig::from_env()?;
//! let stores = bootstrap(&config).await;
//! let state = AppState::new(config, stores);
//!
//! Server::new(state.clone()).run(shutdown_signal()).await?;
//! state.shutdown().await;
//! ```

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod health;
pub mod routes;
pub mod session_factory;
pub mod state;
pub mod store;

pub use bootstrap::{RetryPolicy, bootstrap, bootstrap_with};
pub use config::ServiceConfig;
pub use error::{ConfigError, Result, ServerError, StoreError, StoreResult};
pub use health::{HealthReport, OverallStatus, ServiceStatus, check_health};
pub use session_factory::{ClientSession, ClientSessionFactory, SharedSession};
pub use state::AppState;
pub use store::{
    Connector, DependencyHandle, MockConnector, MockStore, PostgresStore, RedisCache,
    StoreConnection, StoreHandles,
};

use std::future::Future;
use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// The FinDev HTTP server.
pub struct Server<K = RedisCache, R = PostgresStore> {
    /// Application state.
    state: AppState<K, R>,
}

impl<K: StoreConnection, R: StoreConnection> Server<K, R> {
    /// Create a server from an application state.
    pub fn new(state: AppState<K, R>) -> Self {
        Self { state }
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        Router::new()
            .merge(routes::info_routes::<K, R>())
            .merge(routes::health_routes::<K, R>())
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Get the configured bind address.
    pub fn bind_address(&self) -> SocketAddr {
        self.state.config.server.bind_address
    }

    /// Run on the configured address until `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.bind_address();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to bind {addr}: {e}")))?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already-bound listener (useful for testing).
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = self.router();

        if let Ok(addr) = listener.local_addr() {
            info!("Starting server on {}", addr);
        }

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Internal(format!("Server error: {}", e)))?;

        info!("Server stopped accepting requests");
        Ok(())
    }
}
