//! Error types for the server.

use std::time::Duration;

use thiserror::Error;

/// Server error type.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Session construction failed.
    #[error(transparent)]
    Session(#[from] findev_session::Error),

    /// A fetched body failed the session's response check.
    #[error("Response failed '{check}' check: {reason}")]
    ResponseCheck { check: String, reason: String },
}

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a config file.
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// An environment override could not be parsed.
    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
}

/// Backing store errors.
///
/// These never reach request handlers directly: bootstrap turns them into an
/// unavailable handle, health checks turn them into a "down" status, and
/// shutdown logs and drops them.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Redis client error.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// PostgreSQL client error.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// A connect attempt or probe did not finish in time.
    #[error("{service} timed out after {}ms", .timeout.as_millis())]
    Timeout {
        service: &'static str,
        timeout: Duration,
    },

    /// The store answered a probe with something unexpected.
    #[error("{service} probe failed: {reason}")]
    Probe {
        service: &'static str,
        reason: String,
    },

    /// The handle was already closed.
    #[error("{0} connection is closed")]
    Closed(&'static str),

    /// Failure from a non-production store (tests).
    #[error("{0}")]
    Other(String),
}

/// Result type for backing store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
