//! TaxfixClient - the context object a frontend process drives.
//!
//! Owns the auth manager, the session store, and the backend gateways, and
//! orchestrates one send-message call end to end:
//!
//! 1. take the current credential, refreshing lazily if it has expired
//! 2. cancel any stream still open for the session
//! 3. append the user message
//! 4. dispatch to the backend, retrying once after a refresh if the backend
//!    rejects the token (a second auth failure is surfaced, not retried)
//! 5. consume the response stream into a finalized assistant message
//!
//! Progressive content is observable through the session store while the
//! call is in flight; the UI rerenders from snapshots.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures::stream::{AbortHandle, Abortable};
use thiserror::Error;

use crate::adapters::http::{HttpBackendGateway, HttpGatewayConfig};
use crate::config::AppConfig;
use crate::domain::conversation::{Message, Session, StateError};
use crate::domain::foundation::{AuthError, Credential};
use crate::ports::{
    AuthGateway, ChatGateway, DispatchError, ProtocolError, TransportError,
};

use super::auth_manager::AuthManager;
use super::session::SessionStore;
use super::stream_consumer::{StreamConsumer, StreamFailure, StreamOutcome};

/// Outcome of a failed or degenerate send-message call.
///
/// For `Transport`, `Protocol`, and `Cancelled` the partial assistant
/// message has been finalized and preserved in the session.
#[derive(Debug, Error)]
pub enum SendError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    State(#[from] StateError),

    /// The response stream was aborted by a newer send, a reset, or logout.
    /// Not a failure from the user's perspective.
    #[error("response stream was cancelled")]
    Cancelled,

    /// The backend closed the stream without producing any content.
    #[error("backend returned an empty response")]
    EmptyResponse,
}

impl SendError {
    /// Returns true for user- or system-initiated aborts.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SendError::Cancelled)
    }
}

struct ActiveStream {
    stream_token: u64,
    handle: AbortHandle,
}

/// Client-side entry point: auth, session state, and message dispatch.
pub struct TaxfixClient {
    auth: AuthManager,
    sessions: Arc<SessionStore>,
    chat: Arc<dyn ChatGateway>,
    consumer: StreamConsumer,
    active_stream: Mutex<Option<ActiveStream>>,
    next_stream_token: AtomicU64,
    auth_retry_limit: u32,
}

impl TaxfixClient {
    /// Creates a client over explicit gateways (tests inject mocks here).
    pub fn new(auth_gateway: Arc<dyn AuthGateway>, chat_gateway: Arc<dyn ChatGateway>) -> Self {
        let sessions = Arc::new(SessionStore::new());
        Self {
            auth: AuthManager::new(auth_gateway),
            consumer: StreamConsumer::new(Arc::clone(&sessions)),
            sessions,
            chat: chat_gateway,
            active_stream: Mutex::new(None),
            next_stream_token: AtomicU64::new(0),
            auth_retry_limit: 1,
        }
    }

    /// Creates a client talking HTTP to the configured backend.
    pub fn from_config(config: &AppConfig) -> Self {
        let gateway = Arc::new(HttpBackendGateway::new(HttpGatewayConfig::from(
            &config.backend,
        )));
        Self::new(
            Arc::clone(&gateway) as Arc<dyn AuthGateway>,
            gateway as Arc<dyn ChatGateway>,
        )
        .with_auth_retry_limit(config.backend.auth_retry_limit)
    }

    /// Sets how many times a token-rejected send is retried after a
    /// successful refresh.
    pub fn with_auth_retry_limit(mut self, limit: u32) -> Self {
        self.auth_retry_limit = limit;
        self
    }

    /// Auth surface for the UI (`login`/`logout` flows).
    pub fn auth(&self) -> &AuthManager {
        &self.auth
    }

    /// Session surface for the UI (current session snapshots).
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Logs in. A session belonging to a different user is destroyed so the
    /// next send starts a fresh conversation.
    pub async fn login(&self, email: &str, password: &str) -> Result<Arc<Credential>, AuthError> {
        let credential = self.auth.login(email, password).await?;
        let stale_session = self
            .sessions
            .current_session()
            .is_some_and(|s| !s.is_owner(credential.user_id()));
        if stale_session {
            self.abort_active_stream();
            self.sessions.clear();
        }
        Ok(credential)
    }

    /// Registers a new account. Does not log in.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<(), AuthError> {
        self.auth.register(name, email, password).await
    }

    /// Logs out: cancels any open stream, drops the session, clears the
    /// identity. Idempotent.
    pub async fn logout(&self) {
        self.abort_active_stream();
        self.sessions.clear();
        self.auth.logout().await;
    }

    /// Starts a new conversation, cancelling any stream still open for the
    /// old one.
    pub fn reset_session(&self) -> Result<Session, StateError> {
        self.abort_active_stream();
        self.sessions.reset()
    }

    /// Sends user text to the backend and resolves to the finalized
    /// assistant message.
    ///
    /// The user message and the (initially empty) assistant message are
    /// appended to the session as the call progresses; on failure the
    /// assistant message is finalized with whatever content arrived.
    pub async fn send_message(&self, text: &str) -> Result<Message, SendError> {
        let mut credential = self.auth.ensure_fresh().await?;

        let session = match self.sessions.current_session() {
            Some(session) if session.is_owner(credential.user_id()) => session,
            _ => self
                .sessions
                .create_session(credential.user_id().clone()),
        };
        let session_id = *session.id();

        // Only one stream per session: cancel the previous one before this
        // send touches the message tail.
        self.abort_active_stream();

        self.sessions
            .append_message(&session_id, Message::user(text))?;

        let mut auth_attempts = 0u32;
        let stream = loop {
            match self.chat.open_stream(&credential, &session_id, text).await {
                Ok(stream) => break stream,
                Err(DispatchError::Auth(error)) if auth_attempts < self.auth_retry_limit => {
                    auth_attempts += 1;
                    tracing::debug!("send rejected ({}); refreshing and retrying", error);
                    credential = self.auth.refresh().await?;
                }
                Err(DispatchError::Auth(error)) => return Err(SendError::Auth(error)),
                Err(DispatchError::Transport(error)) => return Err(SendError::Transport(error)),
            }
        };

        let (handle, registration) = AbortHandle::new_pair();
        let abortable = Abortable::new(stream, registration);
        let stream_token = self.register_active_stream(handle);

        let consumed = self.consumer.consume(&session_id, abortable).await;
        self.clear_active_stream(stream_token);

        match consumed? {
            StreamOutcome::Completed(message) => Ok(message),
            StreamOutcome::Empty(_) => Err(SendError::EmptyResponse),
            StreamOutcome::Failed { failure, .. } => Err(match failure {
                StreamFailure::Transport(error) => SendError::Transport(error),
                StreamFailure::Protocol(error) => SendError::Protocol(error),
                StreamFailure::Cancelled => SendError::Cancelled,
            }),
        }
    }

    fn abort_active_stream(&self) {
        if let Some(active) = self.active_stream.lock().unwrap().take() {
            tracing::debug!("cancelling open response stream");
            active.handle.abort();
        }
    }

    fn register_active_stream(&self, handle: AbortHandle) -> u64 {
        let stream_token = self.next_stream_token.fetch_add(1, Ordering::SeqCst);
        *self.active_stream.lock().unwrap() = Some(ActiveStream {
            stream_token,
            handle,
        });
        stream_token
    }

    fn clear_active_stream(&self, stream_token: u64) {
        let mut guard = self.active_stream.lock().unwrap();
        if guard
            .as_ref()
            .is_some_and(|active| active.stream_token == stream_token)
        {
            *guard = None;
        }
    }
}

impl std::fmt::Debug for TaxfixClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaxfixClient").finish_non_exhaustive()
    }
}
