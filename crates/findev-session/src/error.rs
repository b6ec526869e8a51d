//! Error types for session cache operations.

use crate::key::SessionKey;

/// Error type for session cache operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The session factory could not build a session for this key.
    #[error("Failed to create session {key}: {message}")]
    Construction { key: SessionKey, message: String },
}

impl Error {
    /// Construction failure for `key`.
    pub fn construction(key: &SessionKey, message: impl Into<String>) -> Self {
        Self::Construction {
            key: key.clone(),
            message: message.into(),
        }
    }

    /// The key whose session failed to build.
    pub fn key(&self) -> &SessionKey {
        match self {
            Self::Construction { key, .. } => key,
        }
    }
}

/// Result type for session cache operations.
pub type Result<T> = std::result::Result<T, Error>;
