//! Integration session cache with TTL expiry.
//!
//! This crate hands out long-lived client sessions to concurrent request
//! handlers:
//! - One session per `(integration, kind)` key, built lazily on first use
//! - Sessions are rebuilt once their age reaches the configured TTL
//! - At most one construction runs per key; other keys are never blocked
//! - Construction failures are returned to the caller and never cached
//!
//! # Example
//!
//! ```rust,ignore
//! use findev_session::{CacheConfig, FnFactory, SessionCache, SessionVariant};
//!
//! let cache = SessionCache::new(CacheConfig::default().with_ttl_secs(3600));
//! let factory = FnFactory::new(|key, _variant| async move { Ok(Arc::new(key)) });
//!
//! let session = cache
//!     .get_or_create("em_web", "Session", &factory, &SessionVariant::http())
//!     .await?;
//! ```

mod cache;
mod config;
mod error;
mod factory;
mod key;

pub use cache::{CacheStats, SessionCache, SessionEntry};
pub use config::CacheConfig;
pub use error::{Error, Result};
pub use factory::{FnFactory, ResponseCheck, SessionFactory, SessionVariant, Transport};
pub use key::SessionKey;
