//! Serve command - bootstraps the stores and runs the HTTP server.

use std::net::SocketAddr;

use anyhow::Result;
use clap::Args;
use tracing::{info, warn};

use findev_server::{AppState, Server, bootstrap};

use super::Context;

/// Arguments for the serve command.
///
/// CLI arguments override config file and environment values.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to bind to (overrides FINDEV_BIND)
    #[arg(short, long)]
    pub bind: Option<SocketAddr>,
}

/// Run the serve command.
pub async fn run(args: ServeArgs, ctx: &Context) -> Result<()> {
    let mut config = ctx.load_config()?;
    if let Some(bind) = args.bind {
        config.server.bind_address = bind;
    }

    let stores = bootstrap(&config).await;
    let state = AppState::new(config, stores);

    let result = Server::new(state.clone()).run(shutdown_signal()).await;

    // Close the stores even if the server failed to start.
    state.shutdown().await;
    info!("Shutdown complete");

    result.map_err(Into::into)
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("Shutdown signal received");
}
