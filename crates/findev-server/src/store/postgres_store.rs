//! PostgreSQL relational store.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_postgres::{Client, NoTls};
use tracing::warn;

use super::{Connector, StoreConnection};
use crate::config::PostgresConfig;
use crate::error::{StoreError, StoreResult};
use crate::health::STORE_SERVICE;

/// How long close waits for the connection task to wind down.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Opens PostgreSQL connections.
#[derive(Debug, Clone)]
pub struct PostgresConnector {
    config: PostgresConfig,
}

impl PostgresConnector {
    pub fn new(config: PostgresConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connector for PostgresConnector {
    type Connection = PostgresStore;

    fn service(&self) -> &'static str {
        STORE_SERVICE
    }

    fn endpoint(&self) -> String {
        format!(
            "{}:{}/{}",
            self.config.host, self.config.port, self.config.database
        )
    }

    async fn connect(&self) -> StoreResult<PostgresStore> {
        let mut pg = tokio_postgres::Config::new();
        pg.host(&self.config.host)
            .port(self.config.port)
            .user(&self.config.user)
            .password(&self.config.password)
            .dbname(&self.config.database)
            .connect_timeout(self.config.connect_timeout());

        let (client, connection) = pg.connect(NoTls).await?;
        let task = tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!(error = %e, "PostgreSQL connection terminated with error");
            }
        });

        Ok(PostgresStore::new(client, task, self.endpoint()))
    }
}

/// A live PostgreSQL connection shared across request handlers.
pub struct PostgresStore {
    client: Mutex<Option<Arc<Client>>>,
    connection_task: Mutex<Option<JoinHandle<()>>>,
    endpoint: String,
}

impl PostgresStore {
    fn new(client: Client, connection_task: JoinHandle<()>, endpoint: String) -> Self {
        Self {
            client: Mutex::new(Some(Arc::new(client))),
            connection_task: Mutex::new(Some(connection_task)),
            endpoint,
        }
    }

    /// The shared client for issuing queries. Fails once closed.
    pub fn client(&self) -> StoreResult<Arc<Client>> {
        self.client
            .lock()
            .clone()
            .ok_or(StoreError::Closed(STORE_SERVICE))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl StoreConnection for PostgresStore {
    async fn probe(&self) -> StoreResult<()> {
        let client = self.client()?;
        client.simple_query("SELECT 1").await?;
        Ok(())
    }

    async fn close(&self) -> StoreResult<()> {
        let client = self.client.lock().take();
        let task = self.connection_task.lock().take();
        let Some(task) = task else {
            return Ok(());
        };

        // The connection future finishes once every client clone is dropped.
        drop(client);
        let abort = task.abort_handle();
        match tokio::time::timeout(CLOSE_GRACE, task).await {
            Ok(_) => Ok(()),
            Err(_) => {
                abort.abort();
                Err(StoreError::Timeout {
                    service: STORE_SERVICE,
                    timeout: CLOSE_GRACE,
                })
            }
        }
    }
}

impl fmt::Debug for PostgresStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresStore")
            .field("endpoint", &self.endpoint)
            .field("open", &self.client.lock().is_some())
            .finish()
    }
}
