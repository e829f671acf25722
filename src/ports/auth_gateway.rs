//! Auth gateway port for backend credential operations.
//!
//! This is the seam between the client's auth state and the backend's auth
//! endpoints. The `AuthManager` owns policy (when to refresh, what counts as
//! logged out); implementations of this port own transport only.
//!
//! # Contract
//!
//! Implementations must:
//! - Return `AuthError::InvalidCredentials` when the backend rejects the
//!   email/password pair
//! - Return `AuthError::RefreshRejected` when the backend refuses to extend
//!   a session (expired refresh window, revoked token)
//! - Return `AuthError::ServiceUnavailable` for transient transport errors
//! - Never retry on their own; retry policy lives with the caller

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, Credential};

/// Backend credential operations: login, register, refresh, logout.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Exchanges an email/password pair for a fresh credential.
    ///
    /// # Returns
    ///
    /// * `Ok(Credential)` - Backend accepted the pair
    /// * `Err(AuthError::InvalidCredentials)` - Backend rejected it
    /// * `Err(AuthError::ServiceUnavailable)` - Backend unreachable
    async fn login(&self, email: &str, password: &str) -> Result<Credential, AuthError>;

    /// Registers a new account. Does not log the user in.
    async fn register(&self, name: &str, email: &str, password: &str) -> Result<(), AuthError>;

    /// Exchanges an existing credential for a fresh one.
    ///
    /// # Returns
    ///
    /// * `Ok(Credential)` - New token with extended expiry
    /// * `Err(AuthError::RefreshRejected)` - Session cannot be extended;
    ///   the caller must treat this as "not logged in"
    async fn refresh(&self, credential: &Credential) -> Result<Credential, AuthError>;

    /// Invalidates the credential server-side. Best effort.
    async fn logout(&self, credential: &Credential) -> Result<(), AuthError>;
}
