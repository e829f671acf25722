//! Authentication types: the logged-in identity and its failure modes.
//!
//! A `Credential` is what the backend hands back from a successful login:
//! an opaque bearer token plus its expiry and the profile of the user it
//! belongs to. The token is wrapped in `secrecy::Secret` so it never leaks
//! through `Debug` output or logs.
//!
//! These are **domain types** with no transport dependencies - any backend
//! gateway can populate them.

use secrecy::{ExposeSecret, Secret};
use thiserror::Error;

use super::{Timestamp, UserId};

/// Profile of an authenticated user, as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    /// The backend-issued user identifier.
    pub id: UserId,

    /// User's email address.
    pub email: String,

    /// Display name if the backend knows one.
    pub display_name: Option<String>,
}

impl UserProfile {
    /// Creates a new user profile.
    pub fn new(id: UserId, email: impl Into<String>, display_name: Option<String>) -> Self {
        Self {
            id,
            email: email.into(),
            display_name,
        }
    }

    /// Returns the display name, or email as fallback.
    pub fn display_name_or_email(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.email)
    }
}

/// A logged-in identity: bearer token, its expiry, and the subject it
/// authenticates.
///
/// Owned by the `AuthManager`; handed out behind `Arc` so sessions reference
/// the identity without copying the token.
pub struct Credential {
    token: Secret<String>,
    subject: UserProfile,
    issued_at: Timestamp,
    expires_at: Timestamp,
}

impl Credential {
    /// Creates a credential from a backend auth response.
    pub fn new(
        token: impl Into<String>,
        subject: UserProfile,
        issued_at: Timestamp,
        expires_at: Timestamp,
    ) -> Self {
        Self {
            token: Secret::new(token.into()),
            subject,
            issued_at,
            expires_at,
        }
    }

    /// Exposes the bearer token for attaching to a request.
    pub fn token(&self) -> &str {
        self.token.expose_secret()
    }

    /// Returns the authenticated user's profile.
    pub fn subject(&self) -> &UserProfile {
        &self.subject
    }

    /// Returns the authenticated user's ID.
    pub fn user_id(&self) -> &UserId {
        &self.subject.id
    }

    /// Returns when the credential was issued.
    pub fn issued_at(&self) -> &Timestamp {
        &self.issued_at
    }

    /// Returns when the credential expires.
    pub fn expires_at(&self) -> &Timestamp {
        &self.expires_at
    }

    /// Checks expiry against an explicit clock reading.
    ///
    /// True when `now` is at or past the expiry instant. Every caller must
    /// check this immediately before using the token.
    pub fn is_expired_at(&self, now: &Timestamp) -> bool {
        !now.is_before(&self.expires_at)
    }

    /// Checks expiry against the current moment.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(&Timestamp::now())
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("subject", &self.subject.id)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Authentication errors.
///
/// Domain-centric: these describe what went wrong from the client's
/// perspective, not the backend's.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// The backend rejected the email/password pair.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// No credential is held; the user must log in first.
    #[error("Not logged in")]
    NotAuthenticated,

    /// The backend rejected the bearer token on an authenticated call.
    #[error("Session token rejected by backend")]
    TokenRejected,

    /// The backend refused to refresh the session (expired refresh window,
    /// revoked session). Equivalent to "not logged in".
    #[error("Session refresh rejected; log in again")]
    RefreshRejected,

    /// The backend rejected a registration attempt.
    #[error("Registration rejected: {0}")]
    RegistrationRejected(String),

    /// The auth endpoints are unreachable or answered garbage.
    #[error("Auth service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AuthError {
    /// Creates a service unavailable error with a message.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    /// Returns true if this error means the user must log in again.
    pub fn requires_reauthentication(&self) -> bool {
        matches!(
            self,
            AuthError::NotAuthenticated | AuthError::TokenRejected | AuthError::RefreshRejected
        )
    }

    /// Returns true if this is a transient error that may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, AuthError::ServiceUnavailable(_))
    }
}
