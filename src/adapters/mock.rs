//! Mock gateway adapters for testing.
//!
//! Configurable implementations of the `AuthGateway` and `ChatGateway`
//! ports so tests can exercise the application layer without a backend.
//!
//! # Example
//!
//! ```ignore
//! let auth = MockAuthGateway::new().with_account("a@b.de", "pw", "user-1");
//! let chat = MockChatGateway::new().with_reply("Hello, world");
//!
//! let credential = auth.login("a@b.de", "pw").await?;
//! let stream = chat.open_stream(&credential, &session_id, "hi").await?;
//! ```

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tokio::time::sleep;

use crate::domain::conversation::StreamChunk;
use crate::domain::foundation::{
    AuthError, Credential, SessionId, Timestamp, UserId, UserProfile,
};
use crate::ports::{
    AuthGateway, ChatGateway, ChunkStream, DispatchError, StreamError, TransportError,
};

/// Default lifetime of mock-issued tokens.
const DEFAULT_TTL_SECS: u64 = 24 * 3600;

struct MockAccount {
    password: String,
    profile: UserProfile,
}

/// Mock auth gateway with registered accounts and scriptable failures.
#[derive(Default)]
pub struct MockAuthGateway {
    accounts: RwLock<HashMap<String, MockAccount>>,
    login_ttl_secs: RwLock<u64>,
    refresh_ttl_secs: RwLock<u64>,
    login_error: Mutex<Option<AuthError>>,
    refresh_error: Mutex<Option<AuthError>>,
    token_counter: AtomicUsize,
    login_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    logout_calls: AtomicUsize,
}

impl MockAuthGateway {
    /// Creates an empty mock gateway issuing 24-hour tokens.
    pub fn new() -> Self {
        let gateway = Self::default();
        *gateway.login_ttl_secs.write().unwrap() = DEFAULT_TTL_SECS;
        *gateway.refresh_ttl_secs.write().unwrap() = DEFAULT_TTL_SECS;
        gateway
    }

    /// Registers an account the gateway will accept.
    pub fn with_account(
        self,
        email: impl Into<String>,
        password: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        let email = email.into();
        let user_id = user_id.into();
        let profile = UserProfile::new(
            UserId::new(&user_id).unwrap(),
            email.clone(),
            Some(format!("Test User {}", user_id)),
        );
        self.accounts.write().unwrap().insert(
            email,
            MockAccount {
                password: password.into(),
                profile,
            },
        );
        self
    }

    /// Sets the lifetime of tokens minted by `login`.
    ///
    /// A lifetime of 0 issues tokens that are already expired, which is how
    /// tests force the lazy-refresh path.
    pub fn with_login_ttl_secs(self, secs: u64) -> Self {
        *self.login_ttl_secs.write().unwrap() = secs;
        self
    }

    /// Forces all logins to fail with the given error.
    pub fn with_login_error(self, error: AuthError) -> Self {
        *self.login_error.lock().unwrap() = Some(error);
        self
    }

    /// Forces all refreshes to fail with the given error.
    pub fn with_refresh_error(self, error: AuthError) -> Self {
        *self.refresh_error.lock().unwrap() = Some(error);
        self
    }

    /// Returns how many login calls were made.
    pub fn login_count(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    /// Returns how many refresh calls were made.
    pub fn refresh_count(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// Returns how many logout calls were made.
    pub fn logout_count(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }

    fn mint_token(&self) -> String {
        let n = self.token_counter.fetch_add(1, Ordering::SeqCst);
        format!("mock-token-{}", n)
    }

    fn mint_credential(&self, profile: UserProfile, ttl_secs: u64) -> Credential {
        let issued_at = Timestamp::now();
        Credential::new(
            self.mint_token(),
            profile,
            issued_at,
            issued_at.plus_secs(ttl_secs),
        )
    }
}

#[async_trait]
impl AuthGateway for MockAuthGateway {
    async fn login(&self, email: &str, password: &str) -> Result<Credential, AuthError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = self.login_error.lock().unwrap().clone() {
            return Err(error);
        }

        let accounts = self.accounts.read().unwrap();
        let account = accounts.get(email).ok_or(AuthError::InvalidCredentials)?;
        if account.password != password {
            return Err(AuthError::InvalidCredentials);
        }

        let profile = account.profile.clone();
        let ttl = *self.login_ttl_secs.read().unwrap();
        drop(accounts);
        Ok(self.mint_credential(profile, ttl))
    }

    async fn register(&self, name: &str, email: &str, password: &str) -> Result<(), AuthError> {
        let mut accounts = self.accounts.write().unwrap();
        if accounts.contains_key(email) {
            return Err(AuthError::RegistrationRejected(
                "email already registered".to_string(),
            ));
        }

        let user_id = format!("user-{}", accounts.len() + 1);
        let profile = UserProfile::new(
            UserId::new(user_id).unwrap(),
            email,
            Some(name.to_string()),
        );
        accounts.insert(
            email.to_string(),
            MockAccount {
                password: password.to_string(),
                profile,
            },
        );
        Ok(())
    }

    async fn refresh(&self, credential: &Credential) -> Result<Credential, AuthError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = self.refresh_error.lock().unwrap().clone() {
            return Err(error);
        }

        let ttl = *self.refresh_ttl_secs.read().unwrap();
        Ok(self.mint_credential(credential.subject().clone(), ttl))
    }

    async fn logout(&self, _credential: &Credential) -> Result<(), AuthError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// One scripted element of a mock chunk stream.
#[derive(Debug, Clone)]
pub enum MockFrame {
    /// Yield a chunk.
    Chunk(StreamChunk),
    /// Yield a stream error element.
    Error(StreamError),
}

/// One scripted response to an `open_stream` call.
#[derive(Debug, Clone)]
pub enum MockDispatch {
    /// Open a stream and emit the frames in order.
    Stream(Vec<MockFrame>),
    /// Reject the call as an auth failure (token rejected).
    RejectAuth,
    /// Reject the call as a transport failure.
    RejectTransport(String),
}

/// A recorded `open_stream` call, for verification.
#[derive(Debug, Clone)]
pub struct RecordedSend {
    /// Bearer token the call carried.
    pub token: String,
    /// Target session.
    pub session_id: SessionId,
    /// User text.
    pub text: String,
}

/// Mock chat gateway with scripted streams (consumed in order).
#[derive(Default)]
pub struct MockChatGateway {
    scripts: Mutex<VecDeque<MockDispatch>>,
    chunk_delay: Mutex<Duration>,
    calls: Arc<Mutex<Vec<RecordedSend>>>,
}

impl MockChatGateway {
    /// Creates a new mock gateway with no scripted responses.
    ///
    /// Unscripted calls stream a default reply.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts a well-formed reply: word-sized content chunks with
    /// contiguous indices, then the terminal chunk.
    pub fn with_reply(self, text: &str) -> Self {
        let frames = well_formed_frames(text);
        self.with_dispatch(MockDispatch::Stream(frames))
    }

    /// Scripts a raw frame sequence (for protocol violation tests).
    pub fn with_frames(self, frames: Vec<MockFrame>) -> Self {
        self.with_dispatch(MockDispatch::Stream(frames))
    }

    /// Scripts an arbitrary dispatch outcome.
    pub fn with_dispatch(self, dispatch: MockDispatch) -> Self {
        self.scripts.lock().unwrap().push_back(dispatch);
        self
    }

    /// Paces the stream: each frame is delayed by this duration.
    ///
    /// Used by cancellation tests that need the first stream to still be
    /// open when the second send starts.
    pub fn with_chunk_delay(self, delay: Duration) -> Self {
        *self.chunk_delay.lock().unwrap() = delay;
        self
    }

    /// Returns how many `open_stream` calls were made.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Returns all recorded calls.
    pub fn calls(&self) -> Vec<RecordedSend> {
        self.calls.lock().unwrap().clone()
    }

    fn next_dispatch(&self) -> MockDispatch {
        self.scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| MockDispatch::Stream(well_formed_frames("Mock reply")))
    }
}

/// Splits text into word-sized chunks with contiguous indices plus the
/// terminal chunk.
fn well_formed_frames(text: &str) -> Vec<MockFrame> {
    let mut frames: Vec<MockFrame> = text
        .split_inclusive(' ')
        .enumerate()
        .map(|(i, word)| MockFrame::Chunk(StreamChunk::content(i as u64, word)))
        .collect();
    frames.push(MockFrame::Chunk(StreamChunk::done(frames.len() as u64)));
    frames
}

#[async_trait]
impl ChatGateway for MockChatGateway {
    async fn open_stream(
        &self,
        credential: &Credential,
        session_id: &SessionId,
        text: &str,
    ) -> Result<ChunkStream, DispatchError> {
        self.calls.lock().unwrap().push(RecordedSend {
            token: credential.token().to_string(),
            session_id: *session_id,
            text: text.to_string(),
        });

        match self.next_dispatch() {
            MockDispatch::RejectAuth => Err(DispatchError::Auth(AuthError::TokenRejected)),
            MockDispatch::RejectTransport(message) => {
                Err(DispatchError::Transport(TransportError::connect(message)))
            }
            MockDispatch::Stream(frames) => {
                let delay = *self.chunk_delay.lock().unwrap();
                let stream = stream::iter(frames).then(move |frame| async move {
                    if !delay.is_zero() {
                        sleep(delay).await;
                    }
                    match frame {
                        MockFrame::Chunk(chunk) => Ok(chunk),
                        MockFrame::Error(error) => Err(error),
                    }
                });
                Ok(Box::pin(stream) as ChunkStream)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::ProtocolError;

    fn test_credential() -> Credential {
        let profile = UserProfile::new(UserId::new("user-1").unwrap(), "a@b.de", None);
        let now = Timestamp::now();
        Credential::new("tok", profile, now, now.plus_secs(3600))
    }

    // ── MockAuthGateway ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn mock_auth_accepts_registered_account() {
        let gateway = MockAuthGateway::new().with_account("a@b.de", "pw", "user-1");

        let credential = gateway.login("a@b.de", "pw").await.unwrap();
        assert_eq!(credential.user_id().as_str(), "user-1");
        assert!(!credential.is_expired());
    }

    #[tokio::test]
    async fn mock_auth_rejects_wrong_password() {
        let gateway = MockAuthGateway::new().with_account("a@b.de", "pw", "user-1");

        let result = gateway.login("a@b.de", "wrong").await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn mock_auth_rejects_unknown_account() {
        let gateway = MockAuthGateway::new();
        let result = gateway.login("nobody@b.de", "pw").await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn mock_auth_zero_ttl_issues_expired_tokens() {
        let gateway = MockAuthGateway::new()
            .with_account("a@b.de", "pw", "user-1")
            .with_login_ttl_secs(0);

        let credential = gateway.login("a@b.de", "pw").await.unwrap();
        assert!(credential.is_expired());
    }

    #[tokio::test]
    async fn mock_auth_refresh_issues_fresh_token() {
        let gateway = MockAuthGateway::new()
            .with_account("a@b.de", "pw", "user-1")
            .with_login_ttl_secs(0);

        let expired = gateway.login("a@b.de", "pw").await.unwrap();
        let refreshed = gateway.refresh(&expired).await.unwrap();

        assert!(!refreshed.is_expired());
        assert_ne!(refreshed.token(), expired.token());
        assert_eq!(refreshed.user_id(), expired.user_id());
        assert_eq!(gateway.refresh_count(), 1);
    }

    #[tokio::test]
    async fn mock_auth_refresh_error_is_injectable() {
        let gateway = MockAuthGateway::new()
            .with_account("a@b.de", "pw", "user-1")
            .with_refresh_error(AuthError::RefreshRejected);

        let credential = gateway.login("a@b.de", "pw").await.unwrap();
        let result = gateway.refresh(&credential).await;
        assert!(matches!(result, Err(AuthError::RefreshRejected)));
    }

    #[tokio::test]
    async fn mock_auth_register_then_login_works() {
        let gateway = MockAuthGateway::new();
        gateway.register("Alice", "alice@b.de", "pw").await.unwrap();

        let credential = gateway.login("alice@b.de", "pw").await.unwrap();
        assert_eq!(credential.subject().display_name_or_email(), "Alice");
    }

    #[tokio::test]
    async fn mock_auth_register_duplicate_email_rejected() {
        let gateway = MockAuthGateway::new().with_account("a@b.de", "pw", "user-1");
        let result = gateway.register("A", "a@b.de", "pw2").await;
        assert!(matches!(result, Err(AuthError::RegistrationRejected(_))));
    }

    // ── MockChatGateway ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn mock_chat_streams_scripted_reply() {
        let gateway = MockChatGateway::new().with_reply("Hello world");
        let session_id = SessionId::new();

        let mut stream = gateway
            .open_stream(&test_credential(), &session_id, "hi")
            .await
            .unwrap();

        let mut content = String::new();
        let mut saw_done = false;
        while let Some(item) = stream.next().await {
            let chunk = item.unwrap();
            if chunk.done {
                saw_done = true;
            } else {
                content.push_str(&chunk.delta);
            }
        }

        assert_eq!(content, "Hello world");
        assert!(saw_done);
    }

    #[tokio::test]
    async fn mock_chat_scripted_frames_keep_their_indices() {
        let gateway = MockChatGateway::new().with_frames(vec![
            MockFrame::Chunk(StreamChunk::content(0, "a")),
            MockFrame::Chunk(StreamChunk::content(5, "b")),
        ]);

        let mut stream = gateway
            .open_stream(&test_credential(), &SessionId::new(), "hi")
            .await
            .unwrap();

        assert_eq!(stream.next().await.unwrap().unwrap().index, 0);
        assert_eq!(stream.next().await.unwrap().unwrap().index, 5);
    }

    #[tokio::test]
    async fn mock_chat_can_inject_stream_errors() {
        let gateway = MockChatGateway::new().with_frames(vec![
            MockFrame::Chunk(StreamChunk::content(0, "partial")),
            MockFrame::Error(StreamError::Transport(TransportError::interrupted(
                "connection reset",
            ))),
        ]);

        let mut stream = gateway
            .open_stream(&test_credential(), &SessionId::new(), "hi")
            .await
            .unwrap();

        assert!(stream.next().await.unwrap().is_ok());
        assert!(matches!(
            stream.next().await.unwrap(),
            Err(StreamError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn mock_chat_can_inject_protocol_errors() {
        let gateway = MockChatGateway::new().with_frames(vec![MockFrame::Error(
            StreamError::Protocol(ProtocolError::malformed("garbage")),
        )]);

        let mut stream = gateway
            .open_stream(&test_credential(), &SessionId::new(), "hi")
            .await
            .unwrap();

        assert!(matches!(
            stream.next().await.unwrap(),
            Err(StreamError::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn mock_chat_rejects_auth_when_scripted() {
        let gateway = MockChatGateway::new().with_dispatch(MockDispatch::RejectAuth);

        let result = gateway
            .open_stream(&test_credential(), &SessionId::new(), "hi")
            .await;

        assert!(matches!(result, Err(DispatchError::Auth(_))));
    }

    #[tokio::test]
    async fn mock_chat_records_calls_with_token_and_text() {
        let gateway = MockChatGateway::new().with_reply("ok");
        let session_id = SessionId::new();

        gateway
            .open_stream(&test_credential(), &session_id, "my question")
            .await
            .unwrap();

        let calls = gateway.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].token, "tok");
        assert_eq!(calls[0].session_id, session_id);
        assert_eq!(calls[0].text, "my question");
    }

    #[tokio::test]
    async fn mock_chat_scripts_consumed_in_order() {
        let gateway = MockChatGateway::new()
            .with_dispatch(MockDispatch::RejectAuth)
            .with_reply("second");

        let first = gateway
            .open_stream(&test_credential(), &SessionId::new(), "a")
            .await;
        assert!(first.is_err());

        let second = gateway
            .open_stream(&test_credential(), &SessionId::new(), "b")
            .await;
        assert!(second.is_ok());
    }
}
