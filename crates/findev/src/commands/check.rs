//! Check command - one-shot dependency health report.

use anyhow::{Result, bail};
use clap::Args;

use findev_server::{bootstrap, check_health};

use super::Context;

/// Arguments for the check command.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Connect attempts for PostgreSQL (overrides POSTGRES_MAX_RETRIES)
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Print compact JSON instead of pretty-printed
    #[arg(long)]
    pub compact: bool,
}

/// Run the check command. Fails when any service is down.
pub async fn run(args: CheckArgs, ctx: &Context) -> Result<()> {
    let mut config = ctx.load_config()?;
    if let Some(retries) = args.max_retries {
        config.postgres.max_retries = retries;
    }

    let stores = bootstrap(&config).await;
    let report = check_health(&stores).await;
    stores.shutdown().await;

    let json = if args.compact {
        serde_json::to_string(&report)?
    } else {
        serde_json::to_string_pretty(&report)?
    };
    println!("{json}");

    if !report.is_healthy() {
        bail!("one or more services are down");
    }
    Ok(())
}
