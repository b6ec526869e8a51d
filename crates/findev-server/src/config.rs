//! Service configuration.
//!
//! # Configuration
//!
//! ```toml
//! [server]
//! bind_address = "0.0.0.0:8000"
//!
//! [redis]
//! host = "redis"
//! port = 6379
//!
//! [postgres]
//! host = "postgres"
//! database = "appdb"
//! max_retries = 10
//! retry_delay_secs = 2
//!
//! [session]
//! ttl_secs = 3600
//! ```
//!
//! # Environment Variables
//!
//! Environment variables override file values; see the `ENV_*` constants.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const ENV_BIND: &str = "FINDEV_BIND";
pub const ENV_ASHARE_CORE_VERSION: &str = "ASHARE_CORE_VERSION";
pub const ENV_REDIS_HOST: &str = "REDIS_HOST";
pub const ENV_REDIS_PORT: &str = "REDIS_PORT";
pub const ENV_REDIS_DB: &str = "REDIS_DB";
pub const ENV_REDIS_CONNECT_TIMEOUT: &str = "REDIS_CONNECT_TIMEOUT";
pub const ENV_POSTGRES_HOST: &str = "POSTGRES_HOST";
pub const ENV_POSTGRES_PORT: &str = "POSTGRES_PORT";
pub const ENV_POSTGRES_USER: &str = "POSTGRES_USER";
pub const ENV_POSTGRES_PASSWORD: &str = "POSTGRES_PASSWORD";
pub const ENV_POSTGRES_DB: &str = "POSTGRES_DB";
pub const ENV_POSTGRES_CONNECT_TIMEOUT: &str = "POSTGRES_CONNECT_TIMEOUT";
pub const ENV_POSTGRES_MAX_RETRIES: &str = "POSTGRES_MAX_RETRIES";
pub const ENV_POSTGRES_RETRY_DELAY: &str = "POSTGRES_RETRY_DELAY";
pub const ENV_SESSION_TTL: &str = "SESSION_TTL";
pub const ENV_SESSION_USER_AGENT: &str = "SESSION_USER_AGENT";
pub const ENV_SESSION_REQUEST_TIMEOUT: &str = "SESSION_REQUEST_TIMEOUT";

/// Full service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerSettings,
    pub redis: RedisConfig,
    pub postgres: PostgresConfig,
    pub session: SessionConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Address to bind the server to.
    pub bind_address: SocketAddr,

    /// Version of the crawler library deployed alongside the service,
    /// reported by `/version` when set.
    pub ashare_core_version: Option<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8000)),
            ashare_core_version: None,
        }
    }
}

/// Cache store (Redis) connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub db: i64,

    /// Bound on the single startup connect attempt.
    pub connect_timeout_secs: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "redis".to_string(),
            port: 6379,
            db: 0,
            connect_timeout_secs: 5,
        }
    }
}

impl RedisConfig {
    /// Connection URL in `redis://host:port/db` form.
    pub fn url(&self) -> String {
        format!("redis://{}:{}/{}", self.host, self.port, self.db)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Relational store (PostgreSQL) connection settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,

    /// Bound on each connect attempt.
    pub connect_timeout_secs: u64,

    /// Connect attempts before the store is marked unavailable.
    pub max_retries: u32,

    /// Fixed delay between failed attempts.
    pub retry_delay_secs: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: "postgres".to_string(),
            port: 5432,
            user: "appuser".to_string(),
            password: "apppass".to_string(),
            database: "appdb".to_string(),
            connect_timeout_secs: 5,
            max_retries: 10,
            retry_delay_secs: 2,
        }
    }
}

impl PostgresConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

impl fmt::Debug for PostgresConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_delay_secs", &self.retry_delay_secs)
            .finish()
    }
}

/// Integration session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Session TTL in seconds.
    pub ttl_secs: u64,

    /// User agent sent by client sessions.
    pub user_agent: String,

    /// Per-request timeout for client sessions.
    pub request_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 3600,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl SessionConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl ServiceConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load from an optional TOML file, then apply environment overrides.
    ///
    /// Resolution order:
    /// 1. Environment variables
    /// 2. Values from `path`
    /// 3. Built-in defaults
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Self::from_env();
        };
        let mut config = Self::from_file(path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse TOML config content. Missing sections and fields take defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply overrides from a variable lookup (the environment in production).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = parse_var(&lookup, ENV_BIND)? {
            self.server.bind_address = addr;
        }
        if let Some(version) = lookup(ENV_ASHARE_CORE_VERSION) {
            self.server.ashare_core_version = Some(version);
        }

        if let Some(host) = lookup(ENV_REDIS_HOST) {
            self.redis.host = host;
        }
        if let Some(port) = parse_var(&lookup, ENV_REDIS_PORT)? {
            self.redis.port = port;
        }
        if let Some(db) = parse_var(&lookup, ENV_REDIS_DB)? {
            self.redis.db = db;
        }
        if let Some(secs) = parse_var(&lookup, ENV_REDIS_CONNECT_TIMEOUT)? {
            self.redis.connect_timeout_secs = secs;
        }

        if let Some(host) = lookup(ENV_POSTGRES_HOST) {
            self.postgres.host = host;
        }
        if let Some(port) = parse_var(&lookup, ENV_POSTGRES_PORT)? {
            self.postgres.port = port;
        }
        if let Some(user) = lookup(ENV_POSTGRES_USER) {
            self.postgres.user = user;
        }
        if let Some(password) = lookup(ENV_POSTGRES_PASSWORD) {
            self.postgres.password = password;
        }
        if let Some(database) = lookup(ENV_POSTGRES_DB) {
            self.postgres.database = database;
        }
        if let Some(secs) = parse_var(&lookup, ENV_POSTGRES_CONNECT_TIMEOUT)? {
            self.postgres.connect_timeout_secs = secs;
        }
        if let Some(retries) = parse_var(&lookup, ENV_POSTGRES_MAX_RETRIES)? {
            self.postgres.max_retries = retries;
        }
        if let Some(secs) = parse_var(&lookup, ENV_POSTGRES_RETRY_DELAY)? {
            self.postgres.retry_delay_secs = secs;
        }

        if let Some(secs) = parse_var(&lookup, ENV_SESSION_TTL)? {
            self.session.ttl_secs = secs;
        }
        if let Some(agent) = lookup(ENV_SESSION_USER_AGENT) {
            self.session.user_agent = agent;
        }
        if let Some(secs) = parse_var(&lookup, ENV_SESSION_REQUEST_TIMEOUT)? {
            self.session.request_timeout_secs = secs;
        }

        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.redis.url(), "redis://redis:6379/0");
        assert_eq!(config.postgres.host, "postgres");
        assert_eq!(config.postgres.port, 5432);
        assert_eq!(config.postgres.max_retries, 10);
        assert_eq!(config.postgres.retry_delay(), Duration::from_secs(2));
        assert_eq!(config.postgres.connect_timeout(), Duration::from_secs(5));
        assert_eq!(config.session.ttl(), Duration::from_secs(3600));
        assert_eq!(config.server.bind_address.port(), 8000);
        assert!(config.server.ashare_core_version.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ServiceConfig::default();
        config
            .apply_env(lookup_from(&[
                (ENV_REDIS_HOST, "localhost"),
                (ENV_REDIS_PORT, "6380"),
                (ENV_POSTGRES_HOST, "db.internal"),
                (ENV_POSTGRES_PASSWORD, "s3cret"),
                (ENV_POSTGRES_MAX_RETRIES, "3"),
                (ENV_POSTGRES_RETRY_DELAY, "1"),
                (ENV_SESSION_TTL, " 600 "),
                (ENV_BIND, "127.0.0.1:9000"),
                (ENV_ASHARE_CORE_VERSION, "v1.0.6"),
            ]))
            .unwrap();

        assert_eq!(config.redis.url(), "redis://localhost:6380/0");
        assert_eq!(config.postgres.host, "db.internal");
        assert_eq!(config.postgres.password, "s3cret");
        assert_eq!(config.postgres.max_retries, 3);
        assert_eq!(config.postgres.retry_delay_secs, 1);
        assert_eq!(config.session.ttl_secs, 600);
        assert_eq!(config.server.bind_address.port(), 9000);
        assert_eq!(config.server.ashare_core_version.as_deref(), Some("v1.0.6"));
        // Untouched values keep defaults
        assert_eq!(config.postgres.user, "appuser");
    }

    #[test]
    fn test_invalid_env_value() {
        let mut config = ServiceConfig::default();
        let err = config
            .apply_env(lookup_from(&[(ENV_POSTGRES_PORT, "five-four-three-two")]))
            .unwrap_err();

        match err {
            ConfigError::InvalidValue { key, value } => {
                assert_eq!(key, ENV_POSTGRES_PORT);
                assert_eq!(value, "five-four-three-two");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_partial_toml() {
        let config = ServiceConfig::from_toml_str(
            r#"
            [postgres]
            host = "pg"
            max_retries = 4

            [session]
            ttl_secs = 120
            "#,
        )
        .unwrap();

        assert_eq!(config.postgres.host, "pg");
        assert_eq!(config.postgres.max_retries, 4);
        assert_eq!(config.postgres.port, 5432);
        assert_eq!(config.session.ttl_secs, 120);
        assert_eq!(config.redis.host, "redis");
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("findev.toml");
        std::fs::write(&path, "[redis]\nhost = \"cache\"\n").unwrap();

        let config = ServiceConfig::from_file(&path).unwrap();
        assert_eq!(config.redis.host, "cache");

        let missing = ServiceConfig::from_file(&dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(ConfigError::ReadFile { .. })));
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = PostgresConfig::default();
        let debug = format!("{config:?}");
        assert!(!debug.contains("apppass"));
        assert!(debug.contains("<redacted>"));
    }
}
