//! Configuration for the session cache.

use std::time::Duration;

/// Default TTL for integration sessions (1 hour).
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Configuration for the session cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum age of a cached session. Applied to each entry when it is created;
    /// a request arriving for an entry at least this old rebuilds it.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl: DEFAULT_TTL }
    }
}

impl CacheConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the TTL for cached sessions.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the TTL in whole seconds.
    pub fn with_ttl_secs(self, secs: u64) -> Self {
        self.with_ttl(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ttl_is_one_hour() {
        assert_eq!(CacheConfig::default().ttl, Duration::from_secs(3600));
    }

    #[test]
    fn test_with_ttl_secs() {
        let config = CacheConfig::new().with_ttl_secs(90);
        assert_eq!(config.ttl, Duration::from_secs(90));
    }
}
