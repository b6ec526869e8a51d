//! CLI command handlers.

pub mod check;
pub mod serve;

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use findev_server::ServiceConfig;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Config file given on the command line, if any.
    pub config_path: Option<PathBuf>,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// Resolve configuration from defaults, the config file, and the environment.
    pub fn load_config(&self) -> Result<ServiceConfig> {
        let config = ServiceConfig::load(self.config_path.as_deref())
            .context("failed to load configuration")?;
        if self.verbose {
            tracing::debug!(?config, "Resolved configuration");
        }
        Ok(config)
    }
}
