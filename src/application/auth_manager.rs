//! AuthManager - owns the process-wide credential and its lifecycle.
//!
//! Policy lives here, transport lives behind the `AuthGateway` port:
//! - login stores the credential as the current identity
//! - refresh is lazy; `ensure_fresh` is called by the send path immediately
//!   before each outgoing call, never in the background
//! - a rejected refresh clears the identity (the user must log in again);
//!   a transient refresh failure keeps it
//! - logout is idempotent and notifies the backend best-effort
//!
//! The credential slot is read and written under a lock that is never held
//! across an await; the gateway call happens between the read and the write
//! (last writer wins, and the UI drives one auth operation at a time).

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::domain::foundation::{AuthError, Credential};
use crate::ports::AuthGateway;

/// Process-wide authentication state.
pub struct AuthManager {
    gateway: Arc<dyn AuthGateway>,
    current: RwLock<Option<Arc<Credential>>>,
}

impl AuthManager {
    /// Creates a manager with no logged-in identity.
    pub fn new(gateway: Arc<dyn AuthGateway>) -> Self {
        Self {
            gateway,
            current: RwLock::new(None),
        }
    }

    /// Logs in and stores the credential as the current identity.
    ///
    /// # Errors
    ///
    /// - `InvalidCredentials` if the backend rejects the pair
    /// - `ServiceUnavailable` if the backend is unreachable
    pub async fn login(&self, email: &str, password: &str) -> Result<Arc<Credential>, AuthError> {
        let credential = Arc::new(self.gateway.login(email, password).await?);
        *self.current.write().await = Some(Arc::clone(&credential));
        tracing::info!(user = %credential.user_id(), "logged in");
        Ok(credential)
    }

    /// Registers a new account. Does not change the current identity.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<(), AuthError> {
        self.gateway.register(name, email, password).await
    }

    /// Returns the current credential, if any. Pure lookup; absent means
    /// "not logged in".
    pub async fn current_credential(&self) -> Option<Arc<Credential>> {
        self.current.read().await.clone()
    }

    /// Returns true if an identity is held (it may still be expired).
    pub async fn is_authenticated(&self) -> bool {
        self.current.read().await.is_some()
    }

    /// Returns a credential that is valid right now, refreshing lazily if
    /// the held one has expired.
    ///
    /// # Errors
    ///
    /// - `NotAuthenticated` if nobody is logged in
    /// - `RefreshRejected` if the expired credential cannot be extended;
    ///   the identity is cleared and the user must log in again
    pub async fn ensure_fresh(&self) -> Result<Arc<Credential>, AuthError> {
        let current = self
            .current
            .read()
            .await
            .clone()
            .ok_or(AuthError::NotAuthenticated)?;

        if !current.is_expired() {
            return Ok(current);
        }

        tracing::debug!("credential expired; refreshing before use");
        self.refresh_from(current).await
    }

    /// Exchanges the current credential for a fresh one unconditionally.
    pub async fn refresh(&self) -> Result<Arc<Credential>, AuthError> {
        let current = self
            .current
            .read()
            .await
            .clone()
            .ok_or(AuthError::NotAuthenticated)?;
        self.refresh_from(current).await
    }

    async fn refresh_from(&self, stale: Arc<Credential>) -> Result<Arc<Credential>, AuthError> {
        match self.gateway.refresh(&stale).await {
            Ok(fresh) => {
                let fresh = Arc::new(fresh);
                *self.current.write().await = Some(Arc::clone(&fresh));
                Ok(fresh)
            }
            Err(error) => {
                if error.requires_reauthentication() {
                    tracing::warn!("refresh rejected; clearing identity");
                    *self.current.write().await = None;
                }
                Err(error)
            }
        }
    }

    /// Clears the current identity. Idempotent; the backend is notified
    /// best-effort.
    pub async fn logout(&self) {
        let taken = self.current.write().await.take();
        if let Some(credential) = taken {
            if let Err(error) = self.gateway.logout(&credential).await {
                tracing::debug!("logout notification failed: {}", error);
            }
            tracing::info!("logged out");
        }
    }
}

impl std::fmt::Debug for AuthManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthManager").finish_non_exhaustive()
    }
}
