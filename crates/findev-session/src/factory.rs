//! Session factories.
//!
//! The cache never builds sessions itself. Callers pass a [`SessionFactory`]
//! on every lookup along with a [`SessionVariant`] that selects how the
//! session should be built. The factory is only invoked on a miss or after
//! expiry, so different call sites may pass different factories for the same
//! integration name.

use std::fmt;
use std::future::Future;

use async_trait::async_trait;

use crate::error::Result;
use crate::key::SessionKey;

/// Transport a session is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Transport {
    /// Browser-style HTTP session (cookies, page headers).
    #[default]
    Http,
    /// Application-protocol session used by mobile/app APIs.
    Native,
}

impl Transport {
    /// Map the routing layer's `use_http` flag.
    pub fn from_use_http(use_http: bool) -> Self {
        if use_http { Self::Http } else { Self::Native }
    }
}

/// Response format check a session enforces on what it fetches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResponseCheck {
    /// Bodies must parse as JSON.
    Json,
    /// Any other mode, passed through to the factory verbatim.
    Named(String),
}

impl ResponseCheck {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Json => "json",
            Self::Named(name) => name,
        }
    }
}

impl From<&str> for ResponseCheck {
    fn from(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Named(s.to_string())
        }
    }
}

impl fmt::Display for ResponseCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Construction parameters handed to a factory.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionVariant {
    pub transport: Transport,
    pub check: Option<ResponseCheck>,
}

impl SessionVariant {
    /// HTTP session with no response check.
    pub fn http() -> Self {
        Self::default()
    }

    /// Application-protocol session with no response check.
    pub fn native() -> Self {
        Self {
            transport: Transport::Native,
            check: None,
        }
    }

    /// Build a variant from the routing layer's `use_http` / `check` arguments.
    pub fn from_flags(use_http: bool, check: Option<&str>) -> Self {
        Self {
            transport: Transport::from_use_http(use_http),
            check: check.map(ResponseCheck::from),
        }
    }

    /// Require responses to pass `check`.
    pub fn with_check(mut self, check: ResponseCheck) -> Self {
        self.check = Some(check);
        self
    }
}

/// Builds a fresh session handle for a key.
///
/// Handles are cloned out of the cache for every caller, so they should be
/// cheap to clone (typically an `Arc`).
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// The handle type stored in the cache.
    type Handle: Clone + Send + Sync + 'static;

    /// Build a session for `key`. Errors are returned to the caller as-is and
    /// nothing is cached.
    async fn create(&self, key: &SessionKey, variant: &SessionVariant) -> Result<Self::Handle>;
}

/// Adapts an async closure into a [`SessionFactory`].
pub struct FnFactory<F> {
    f: F,
}

impl<F> FnFactory<F> {
    pub fn new<Fut, H>(f: F) -> Self
    where
        F: Fn(SessionKey, SessionVariant) -> Fut + Send + Sync,
        Fut: Future<Output = Result<H>> + Send,
    {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut, H> SessionFactory for FnFactory<F>
where
    F: Fn(SessionKey, SessionVariant) -> Fut + Send + Sync,
    Fut: Future<Output = Result<H>> + Send,
    H: Clone + Send + Sync + 'static,
{
    type Handle = H;

    async fn create(&self, key: &SessionKey, variant: &SessionVariant) -> Result<H> {
        (self.f)(key.clone(), variant.clone()).await
    }
}
