//! HTTP client sessions handed to the crawler library.
//!
//! [`ClientSessionFactory`] builds one `reqwest` client per session key.
//! The variant decides how the client is set up:
//! - `Transport::Http`: cookie store enabled, HTTP/1.1 only, like a browser
//!   visiting the site's pages
//! - `Transport::Native`: no cookie store, HTTP/2 negotiated where offered,
//!   like a mobile app calling its API
//! - `ResponseCheck::Json`: sends `Accept: application/json` and rejects
//!   non-JSON bodies in [`ClientSession::check_response`]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use findev_session::{
    Error as SessionError, ResponseCheck, SessionFactory, SessionKey, SessionVariant, Transport,
};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};

use crate::config::SessionConfig;
use crate::error::{Result, ServerError};

/// Shared handle stored in the session cache.
pub type SharedSession = Arc<ClientSession>;

/// A reusable client session for one integration.
#[derive(Debug)]
pub struct ClientSession {
    key: SessionKey,
    variant: SessionVariant,
    client: reqwest::Client,
    created_at: DateTime<Utc>,
}

impl ClientSession {
    /// The underlying HTTP client (carries cookies and default headers).
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    pub fn transport(&self) -> Transport {
        self.variant.transport
    }

    pub fn check(&self) -> Option<&ResponseCheck> {
        self.variant.check.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Validate a fetched body against this session's response check.
    ///
    /// Named checks other than `json` are left to the crawler and always pass.
    pub fn check_response(&self, body: &[u8]) -> Result<()> {
        match &self.variant.check {
            Some(ResponseCheck::Json) => serde_json::from_slice::<serde::de::IgnoredAny>(body)
                .map(|_| ())
                .map_err(|e| ServerError::ResponseCheck {
                    check: ResponseCheck::Json.to_string(),
                    reason: e.to_string(),
                }),
            Some(ResponseCheck::Named(_)) | None => Ok(()),
        }
    }
}

/// Builds [`ClientSession`]s from the configured user agent and timeout.
#[derive(Debug, Clone)]
pub struct ClientSessionFactory {
    user_agent: String,
    request_timeout: Duration,
}

impl ClientSessionFactory {
    pub fn new(user_agent: impl Into<String>, request_timeout: Duration) -> Self {
        Self {
            user_agent: user_agent.into(),
            request_timeout,
        }
    }
}

impl From<&SessionConfig> for ClientSessionFactory {
    fn from(config: &SessionConfig) -> Self {
        Self::new(config.user_agent.clone(), config.request_timeout())
    }
}

#[async_trait]
impl SessionFactory for ClientSessionFactory {
    type Handle = SharedSession;

    async fn create(
        &self,
        key: &SessionKey,
        variant: &SessionVariant,
    ) -> findev_session::Result<SharedSession> {
        let mut headers = HeaderMap::new();
        if variant.check == Some(ResponseCheck::Json) {
            headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        }

        let builder = reqwest::Client::builder()
            .user_agent(self.user_agent.as_str())
            .timeout(self.request_timeout)
            .default_headers(headers);

        let builder = match variant.transport {
            Transport::Http => builder.cookie_store(true).http1_only(),
            Transport::Native => builder,
        };

        let client = builder
            .build()
            .map_err(|e| SessionError::construction(key, e.to_string()))?;

        Ok(Arc::new(ClientSession {
            key: key.clone(),
            variant: variant.clone(),
            client,
            created_at: Utc::now(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory() -> ClientSessionFactory {
        ClientSessionFactory::from(&SessionConfig::default())
    }

    #[tokio::test]
    async fn test_builds_http_session() {
        let key = SessionKey::new("ths_web", "Session");
        let session = factory()
            .create(&key, &SessionVariant::http())
            .await
            .unwrap();

        assert_eq!(session.key(), &key);
        assert_eq!(session.transport(), Transport::Http);
        assert!(session.check().is_none());
    }

    #[tokio::test]
    async fn test_builds_native_json_session() {
        let key = SessionKey::new("jyhf_app", "Session");
        let variant = SessionVariant::from_flags(false, Some("json"));
        let session = factory().create(&key, &variant).await.unwrap();

        assert_eq!(session.transport(), Transport::Native);
        assert_eq!(session.check(), Some(&ResponseCheck::Json));
    }

    #[tokio::test]
    async fn test_json_check_rejects_html() {
        let session = factory()
            .create(
                &SessionKey::new("jyhf_app", "Session"),
                &SessionVariant::native().with_check(ResponseCheck::Json),
            )
            .await
            .unwrap();

        assert!(session.check_response(br#"{"data": [1, 2, 3]}"#).is_ok());
        let err = session
            .check_response(b"<html>login required</html>")
            .unwrap_err();
        assert!(matches!(err, ServerError::ResponseCheck { ref check, .. } if check == "json"));
    }

    #[tokio::test]
    async fn test_unchecked_session_accepts_anything() {
        let session = factory()
            .create(&SessionKey::new("em_web", "Session"), &SessionVariant::http())
            .await
            .unwrap();

        assert!(session.check_response(b"<html></html>").is_ok());
    }
}
