//! HTTP backend gateway - `reqwest` implementation of the auth and chat
//! ports against the TaxFix agent backend.
//!
//! Auth endpoints are plain JSON POSTs; the chat endpoint answers with an
//! SSE stream that is parsed incrementally (see `sse`).
//!
//! # Configuration
//!
//! ```ignore
//! let config = HttpGatewayConfig::new("http://localhost:8000")
//!     .with_request_timeout(Duration::from_secs(30))
//!     .with_stream_timeout(Duration::from_secs(120));
//!
//! let gateway = HttpBackendGateway::new(config);
//! ```

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use std::time::Duration;

use crate::config::BackendConfig;
use crate::domain::foundation::{AuthError, Credential, SessionId, Timestamp};
use crate::ports::{
    AuthGateway, ChatGateway, ChunkStream, DispatchError, StreamError, TransportError,
};

use super::dto::{AuthResponse, ChatStreamRequest, LoginRequest, RegisterRequest};
use super::sse::SseParser;

/// Token lifetime assumed when the backend omits `expires_at` (it issues
/// 24-hour tokens).
const DEFAULT_TOKEN_TTL_SECS: u64 = 24 * 3600;

/// Configuration for the HTTP backend gateway.
#[derive(Debug, Clone)]
pub struct HttpGatewayConfig {
    /// Base URL of the agent backend (e.g., "http://localhost:8000").
    pub base_url: String,
    /// Timeout for plain request/response calls.
    pub request_timeout: Duration,
    /// Timeout for the whole lifetime of a streaming call.
    pub stream_timeout: Duration,
}

impl HttpGatewayConfig {
    /// Creates a configuration with the given base URL and default timeouts.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout: Duration::from_secs(30),
            stream_timeout: Duration::from_secs(120),
        }
    }

    /// Sets the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the streaming timeout.
    pub fn with_stream_timeout(mut self, timeout: Duration) -> Self {
        self.stream_timeout = timeout;
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn login_url(&self) -> String {
        self.endpoint("/auth/login")
    }

    fn register_url(&self) -> String {
        self.endpoint("/auth/register")
    }

    fn refresh_url(&self) -> String {
        self.endpoint("/auth/refresh")
    }

    fn logout_url(&self) -> String {
        self.endpoint("/auth/logout")
    }

    fn stream_url(&self) -> String {
        self.endpoint("/chat/message/stream")
    }
}

impl From<&BackendConfig> for HttpGatewayConfig {
    fn from(config: &BackendConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            stream_timeout: Duration::from_secs(config.stream_timeout_secs),
        }
    }
}

/// HTTP implementation of `AuthGateway` and `ChatGateway`.
pub struct HttpBackendGateway {
    config: HttpGatewayConfig,
    client: Client,
    // Streaming calls outlive the request timeout, so they get their own
    // client with the stream timeout applied.
    stream_client: Client,
}

impl HttpBackendGateway {
    /// Creates a new gateway from configuration.
    pub fn new(config: HttpGatewayConfig) -> Self {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("Failed to create HTTP client");
        let stream_client = Client::builder()
            .timeout(config.stream_timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            config,
            client,
            stream_client,
        }
    }

    /// Posts to an auth endpoint and decodes the response envelope.
    async fn post_auth(
        &self,
        url: String,
        body: &impl serde::Serialize,
        bearer: Option<&str>,
    ) -> Result<AuthResponse, AuthError> {
        let mut request = self.client.post(&url).json(body);
        if let Some(token) = bearer {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!("auth request to {} failed: {}", url, e);
            AuthError::service_unavailable(e.to_string())
        })?;

        let status = response.status();
        match status.as_u16() {
            200 => {}
            401 | 403 => return Err(AuthError::InvalidCredentials),
            _ => {
                let body = response.text().await.unwrap_or_default();
                tracing::error!("auth endpoint {} returned {}: {}", url, status, body);
                return Err(AuthError::service_unavailable(format!(
                    "auth endpoint returned {}",
                    status
                )));
            }
        }

        response.json().await.map_err(|e| {
            tracing::error!("unparseable auth response from {}: {}", url, e);
            AuthError::service_unavailable(format!("unparseable auth response: {}", e))
        })
    }

    /// Builds a credential from a successful auth envelope.
    fn credential_from_response(response: AuthResponse) -> Result<Credential, AuthError> {
        let token = response
            .token
            .ok_or_else(|| AuthError::service_unavailable("auth response missing token"))?;
        let profile = response
            .user
            .ok_or_else(|| AuthError::service_unavailable("auth response missing user"))?
            .into_profile()?;

        let issued_at = Timestamp::now();
        let expires_at = response
            .expires_at
            .unwrap_or_else(|| issued_at.plus_secs(DEFAULT_TOKEN_TTL_SECS));

        Ok(Credential::new(token, profile, issued_at, expires_at))
    }

    /// Classifies a reqwest error on stream open.
    fn classify_dispatch_error(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout {
                timeout_secs: self.config.stream_timeout.as_secs(),
            }
        } else {
            TransportError::connect(e.to_string())
        }
    }
}

#[async_trait]
impl AuthGateway for HttpBackendGateway {
    async fn login(&self, email: &str, password: &str) -> Result<Credential, AuthError> {
        let body = LoginRequest { email, password };
        let response = self.post_auth(self.config.login_url(), &body, None).await?;

        if !response.success {
            tracing::debug!(
                "login rejected: {}",
                response.message.as_deref().unwrap_or("no reason given")
            );
            return Err(AuthError::InvalidCredentials);
        }

        Self::credential_from_response(response)
    }

    async fn register(&self, name: &str, email: &str, password: &str) -> Result<(), AuthError> {
        let body = RegisterRequest {
            name,
            email,
            password,
        };
        let response = self
            .post_auth(self.config.register_url(), &body, None)
            .await?;

        if !response.success {
            let reason = response
                .message
                .unwrap_or_else(|| "registration failed".to_string());
            return Err(AuthError::RegistrationRejected(reason));
        }

        Ok(())
    }

    async fn refresh(&self, credential: &Credential) -> Result<Credential, AuthError> {
        let response = self
            .post_auth(
                self.config.refresh_url(),
                &serde_json::json!({}),
                Some(credential.token()),
            )
            .await
            .map_err(|e| match e {
                // A rejected bearer on the refresh endpoint means the session
                // cannot be extended, not that the password was wrong.
                AuthError::InvalidCredentials => AuthError::RefreshRejected,
                other => other,
            })?;

        if !response.success {
            tracing::debug!(
                "refresh rejected: {}",
                response.message.as_deref().unwrap_or("no reason given")
            );
            return Err(AuthError::RefreshRejected);
        }

        let token = response
            .token
            .ok_or_else(|| AuthError::service_unavailable("refresh response missing token"))?;
        let issued_at = Timestamp::now();
        let expires_at = response
            .expires_at
            .unwrap_or_else(|| issued_at.plus_secs(DEFAULT_TOKEN_TTL_SECS));

        // The subject does not change across a refresh; reuse the profile
        // unless the backend sent an updated one.
        let profile = match response.user {
            Some(user) => user.into_profile()?,
            None => credential.subject().clone(),
        };

        Ok(Credential::new(token, profile, issued_at, expires_at))
    }

    async fn logout(&self, credential: &Credential) -> Result<(), AuthError> {
        let response = self
            .client
            .post(self.config.logout_url())
            .header("Authorization", format!("Bearer {}", credential.token()))
            .send()
            .await
            .map_err(|e| AuthError::service_unavailable(e.to_string()))?;

        if !response.status().is_success() {
            tracing::debug!("logout endpoint returned {}", response.status());
        }
        Ok(())
    }
}

#[async_trait]
impl ChatGateway for HttpBackendGateway {
    async fn open_stream(
        &self,
        credential: &Credential,
        session_id: &SessionId,
        text: &str,
    ) -> Result<ChunkStream, DispatchError> {
        let body = ChatStreamRequest {
            content: text,
            session_id: session_id.to_string(),
        };

        let response = self
            .stream_client
            .post(self.config.stream_url())
            .header("Authorization", format!("Bearer {}", credential.token()))
            .header("Accept", "text/event-stream")
            .json(&body)
            .send()
            .await
            .map_err(|e| DispatchError::Transport(self.classify_dispatch_error(e)))?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            tracing::debug!("chat endpoint rejected the session token");
            return Err(DispatchError::Auth(AuthError::TokenRejected));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::Transport(TransportError::status(
                status.as_u16(),
                body,
            )));
        }

        let mut parser = SseParser::new();
        let stream_timeout_secs = self.config.stream_timeout.as_secs();

        let stream = response
            .bytes_stream()
            .map(move |read| match read {
                Ok(bytes) => parser
                    .feed(&bytes)
                    .into_iter()
                    .map(|chunk| chunk.map_err(StreamError::from))
                    .collect::<Vec<_>>(),
                Err(e) => {
                    let error = if e.is_timeout() {
                        TransportError::Timeout {
                            timeout_secs: stream_timeout_secs,
                        }
                    } else {
                        TransportError::interrupted(e.to_string())
                    };
                    vec![Err(StreamError::Transport(error))]
                }
            })
            .flat_map(stream::iter);

        Ok(Box::pin(stream))
    }
}

impl std::fmt::Debug for HttpBackendGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackendGateway")
            .field("base_url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builds_endpoint_urls() {
        let config = HttpGatewayConfig::new("http://localhost:8000");
        assert_eq!(config.login_url(), "http://localhost:8000/auth/login");
        assert_eq!(config.refresh_url(), "http://localhost:8000/auth/refresh");
        assert_eq!(
            config.stream_url(),
            "http://localhost:8000/chat/message/stream"
        );
    }

    #[test]
    fn config_handles_trailing_slash() {
        let config = HttpGatewayConfig::new("http://localhost:8000/");
        assert_eq!(config.login_url(), "http://localhost:8000/auth/login");
    }

    #[test]
    fn config_builder_sets_timeouts() {
        let config = HttpGatewayConfig::new("http://localhost:8000")
            .with_request_timeout(Duration::from_secs(5))
            .with_stream_timeout(Duration::from_secs(60));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.stream_timeout, Duration::from_secs(60));
    }

    #[test]
    fn config_from_backend_config_copies_fields() {
        let backend = BackendConfig {
            base_url: "http://backend:9000".to_string(),
            request_timeout_secs: 10,
            stream_timeout_secs: 90,
            auth_retry_limit: 1,
        };
        let config = HttpGatewayConfig::from(&backend);
        assert_eq!(config.base_url, "http://backend:9000");
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.stream_timeout, Duration::from_secs(90));
    }

    #[test]
    fn gateway_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<HttpBackendGateway>();
    }

    #[tokio::test]
    #[ignore = "Requires a running TaxFix backend"]
    async fn integration_test_login_roundtrip() {
        let base_url = std::env::var("TAXFIX_TEST_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8000".to_string());
        let gateway = HttpBackendGateway::new(HttpGatewayConfig::new(base_url));

        let result = gateway.login("test@example.com", "test-password").await;
        assert!(result.is_ok(), "login failed: {:?}", result.err());
    }
}
