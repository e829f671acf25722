//! Backend endpoint configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Agent backend configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the agent backend
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout for plain request/response calls, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Timeout for the whole lifetime of a streaming call, in seconds
    #[serde(default = "default_stream_timeout")]
    pub stream_timeout_secs: u64,

    /// How many times a token-rejected send is retried after a refresh
    #[serde(default = "default_auth_retry_limit")]
    pub auth_retry_limit: u32,
}

impl BackendConfig {
    /// Validate backend configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ValidationError::InvalidBaseUrl);
        }
        if self.request_timeout_secs == 0 || self.request_timeout_secs > 300 {
            return Err(ValidationError::InvalidRequestTimeout);
        }
        if self.stream_timeout_secs == 0 || self.stream_timeout_secs > 600 {
            return Err(ValidationError::InvalidStreamTimeout);
        }
        Ok(())
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
            stream_timeout_secs: default_stream_timeout(),
            auth_retry_limit: default_auth_retry_limit(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_stream_timeout() -> u64 {
    120
}

fn default_auth_retry_limit() -> u32 {
    1
}
