//! FinDev backend service.
//!
//! Main entry point for the `findev` binary.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;

mod commands;

use commands::{check, serve};

/// FinDev backend service
#[derive(Parser)]
#[command(name = "findev")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// TOML config file (environment variables still take precedence)
    #[arg(long, global = true, env = "FINDEV_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory for rotating JSON log files (disabled when unset)
    #[arg(long, global = true, env = "FINDEV_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Connect to the backing stores and serve HTTP
    Serve(serve::ServeArgs),

    /// Connect to the backing stores, print a health report, and exit
    Check(check::CheckArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _guard = init_tracing(cli.verbose, cli.log_dir.as_deref());

    let ctx = commands::Context {
        config_path: cli.config,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Serve(args) => serve::run(args, &ctx).await,
        Commands::Check(args) => check::run(args, &ctx).await,
    }
}

/// Console logging on stderr, plus a daily-rotated JSON file when `log_dir`
/// is set. The returned guard flushes the file writer on drop.
fn init_tracing(verbose: bool, log_dir: Option<&std::path::Path>) -> Option<WorkerGuard> {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};

    let console_filter = if verbose {
        "findev=debug,findev_server=debug,findev_session=debug,tower_http=debug,info"
    } else {
        "findev=info,findev_server=info,findev_session=info,warn"
    };
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(console_filter));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "findev.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_filter(EnvFilter::new(
                    "findev=trace,findev_server=trace,findev_session=trace,info",
                ));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .with(file_layer)
        .init();

    guard
}
