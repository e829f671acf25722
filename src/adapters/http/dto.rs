//! Wire types for the backend HTTP API.
//!
//! The backend wraps auth outcomes in a `{success, message, token, user}`
//! envelope and reports rejections as `success = false` with HTTP 200, so
//! both the status code and the envelope have to be inspected.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AuthError, Timestamp, UserId, UserProfile};

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct RegisterRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// Envelope returned by all auth endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct AuthResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<UserDto>,
    #[serde(default)]
    pub expires_at: Option<Timestamp>,
}

/// User payload inside an auth envelope.
///
/// The backend is inconsistent about the ID field name (`id` in newer
/// responses, `user_id` in older ones); accept both.
#[derive(Debug, Deserialize)]
pub(crate) struct UserDto {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl UserDto {
    /// Converts the wire payload to a domain profile.
    pub fn into_profile(self) -> Result<UserProfile, AuthError> {
        let raw_id = self
            .id
            .or(self.user_id)
            .ok_or_else(|| AuthError::service_unavailable("auth response missing user id"))?;
        let id = UserId::new(raw_id)
            .map_err(|e| AuthError::service_unavailable(format!("invalid user id: {}", e)))?;
        Ok(UserProfile::new(id, self.email, self.name))
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatStreamRequest<'a> {
    pub content: &'a str,
    pub session_id: String,
}

/// One SSE data frame of a streamed chat response.
#[derive(Debug, Deserialize)]
pub(crate) struct StreamFrame {
    pub delta: String,
}
