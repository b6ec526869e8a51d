//! Common test utilities for integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use reqwest::Client;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use findev_server::{
    AppState, MockConnector, MockStore, RetryPolicy, Server, ServiceConfig, bootstrap_with,
};

/// A test server that runs in the background.
pub struct TestServer {
    /// The server's address.
    pub addr: SocketAddr,
    /// HTTP client configured for this server.
    pub client: Client,
    /// State shared with the running server.
    pub state: AppState<MockStore, MockStore>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    /// Start a server whose stores are both reachable.
    pub async fn start() -> Result<Self> {
        Self::start_with(MockConnector::new("redis"), MockConnector::new("postgres")).await
    }

    /// Bootstrap through the given connectors, then serve on a random port.
    pub async fn start_with(cache: MockConnector, store: MockConnector) -> Result<Self> {
        let policy = RetryPolicy {
            max_attempts: 3,
            delay: Duration::from_millis(1),
            connect_timeout: Duration::from_millis(200),
        };
        let stores = bootstrap_with(&cache, Duration::from_millis(200), &store, &policy).await;
        let state = AppState::new(ServiceConfig::default(), stores);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let (tx, rx) = oneshot::channel::<()>();
        let server = Server::new(state.clone());
        let handle = tokio::spawn(async move {
            let _ = server
                .serve(listener, async move {
                    let _ = rx.await;
                })
                .await;
        });

        let client = Client::new();
        wait_for_server(&client, addr).await?;

        Ok(Self {
            addr,
            client,
            state,
            shutdown: Some(tx),
            handle: Some(handle),
        })
    }

    /// Get the base URL for the server.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.get(format!("{}{}", self.base_url(), path))
    }

    /// Stop accepting requests, wait for the server task, then close the stores.
    pub async fn stop(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            timeout(Duration::from_secs(5), handle).await??;
        }
        self.state.shutdown().await;
        Ok(())
    }
}

/// Wait for the server to answer on `/health`.
async fn wait_for_server(client: &Client, addr: SocketAddr) -> Result<()> {
    let url = format!("http://{}/health", addr);

    let result = timeout(Duration::from_secs(5), async {
        loop {
            match client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => return,
                _ => tokio::time::sleep(Duration::from_millis(50)).await,
            }
        }
    })
    .await;

    match result {
        Ok(()) => Ok(()),
        Err(_) => anyhow::bail!("Timeout waiting for server to start"),
    }
}
