//! Redis cache store.

use std::fmt;

use async_trait::async_trait;
use parking_lot::Mutex;
use redis::aio::MultiplexedConnection;

use super::{Connector, StoreConnection};
use crate::config::RedisConfig;
use crate::error::{StoreError, StoreResult};
use crate::health::CACHE_SERVICE;

/// Opens multiplexed Redis connections.
#[derive(Debug, Clone)]
pub struct RedisConnector {
    config: RedisConfig,
}

impl RedisConnector {
    pub fn new(config: RedisConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connector for RedisConnector {
    type Connection = RedisCache;

    fn service(&self) -> &'static str {
        CACHE_SERVICE
    }

    fn endpoint(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    async fn connect(&self) -> StoreResult<RedisCache> {
        let client = redis::Client::open(self.config.url().as_str())?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(RedisCache::new(conn, self.endpoint()))
    }
}

/// A live Redis connection shared across request handlers.
///
/// The multiplexed connection is cheap to clone; handlers take a clone per
/// command via [`RedisCache::connection`].
pub struct RedisCache {
    conn: Mutex<Option<MultiplexedConnection>>,
    endpoint: String,
}

impl RedisCache {
    fn new(conn: MultiplexedConnection, endpoint: String) -> Self {
        Self {
            conn: Mutex::new(Some(conn)),
            endpoint,
        }
    }

    /// A connection clone for issuing commands. Fails once closed.
    pub fn connection(&self) -> StoreResult<MultiplexedConnection> {
        self.conn
            .lock()
            .clone()
            .ok_or(StoreError::Closed(CACHE_SERVICE))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl StoreConnection for RedisCache {
    async fn probe(&self) -> StoreResult<()> {
        let mut conn = self.connection()?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        if pong != "PONG" {
            return Err(StoreError::Probe {
                service: CACHE_SERVICE,
                reason: format!("unexpected PING reply '{pong}'"),
            });
        }
        Ok(())
    }

    async fn close(&self) -> StoreResult<()> {
        // Dropping the last clone shuts the multiplexed connection down.
        self.conn.lock().take();
        Ok(())
    }
}

impl fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCache")
            .field("endpoint", &self.endpoint)
            .field("open", &self.conn.lock().is_some())
            .finish()
    }
}
