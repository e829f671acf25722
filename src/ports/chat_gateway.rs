//! Chat gateway port - dispatching a user message and streaming the reply.
//!
//! The gateway posts the session ID and user text to the backend and hands
//! back an ordered, lazy sequence of `StreamChunk`s. The sequence is finite:
//! it ends on the chunk with `done = true`, or with an error element when
//! the transport fails mid-stream - never by silent truncation.
//!
//! Ordering and duplicate detection are enforced by the consumer, not
//! assumed from the transport; the gateway's only ordering obligation is to
//! yield chunks as they arrive.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use thiserror::Error;

use crate::domain::conversation::StreamChunk;
use crate::domain::foundation::{AuthError, Credential, SessionId};

/// Ordered, lazy sequence of stream chunks from one send-message call.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, StreamError>> + Send>>;

/// Port for dispatching user messages to the backend agent.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Posts `text` for `session_id` with the credential attached and opens
    /// the response stream.
    ///
    /// # Returns
    ///
    /// * `Ok(ChunkStream)` - Response accepted; chunks follow lazily
    /// * `Err(DispatchError::Auth)` - Backend rejected the bearer token
    /// * `Err(DispatchError::Transport)` - Backend unreachable or refused
    async fn open_stream(
        &self,
        credential: &Credential,
        session_id: &SessionId,
        text: &str,
    ) -> Result<ChunkStream, DispatchError>;
}

/// Connection-level failure talking to the backend.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Could not reach the backend at all.
    #[error("cannot connect to backend: {0}")]
    Connect(String),

    /// The request or stream read timed out.
    #[error("request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// The connection dropped while the stream was open.
    #[error("connection lost mid-stream: {0}")]
    Interrupted(String),

    /// The backend answered with a non-success status.
    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

impl TransportError {
    /// Creates a connect error.
    pub fn connect(message: impl Into<String>) -> Self {
        Self::Connect(message.into())
    }

    /// Creates a mid-stream interruption error.
    pub fn interrupted(message: impl Into<String>) -> Self {
        Self::Interrupted(message.into())
    }

    /// Creates a status error.
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }
}

/// Malformed or mis-sequenced stream data.
///
/// Protocol violations mean the client and backend disagree about the wire
/// format; the stream is treated as failed, the accepted prefix preserved.
#[derive(Debug, Clone, Error)]
pub enum ProtocolError {
    /// A stream frame could not be parsed.
    #[error("malformed stream frame: {0}")]
    MalformedFrame(String),

    /// A chunk arrived with a higher index than expected.
    #[error("chunk index {got} arrived where {expected} was expected")]
    OutOfOrder { expected: u64, got: u64 },

    /// A chunk repeated an already-consumed index.
    #[error("duplicate chunk index {0}")]
    DuplicateIndex(u64),
}

impl ProtocolError {
    /// Creates a malformed frame error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedFrame(message.into())
    }
}

/// Error element within an open chunk stream.
#[derive(Debug, Clone, Error)]
pub enum StreamError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Failure to open the stream in the first place.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_gateway_trait_is_object_safe_and_send_sync() {
        fn _assert_trait_object(_: &dyn ChatGateway) {}
        fn _assert_arc_send_sync<T: Send + Sync + ?Sized>() {}
        _assert_arc_send_sync::<std::sync::Arc<dyn ChatGateway>>();
    }

    #[test]
    fn transport_error_displays_status() {
        let err = TransportError::status(502, "bad gateway");
        assert_eq!(err.to_string(), "backend returned HTTP 502: bad gateway");
    }

    #[test]
    fn protocol_error_displays_sequence_details() {
        let err = ProtocolError::OutOfOrder {
            expected: 3,
            got: 7,
        };
        assert_eq!(
            err.to_string(),
            "chunk index 7 arrived where 3 was expected"
        );
    }

    #[test]
    fn stream_error_wraps_transport_transparently() {
        let err: StreamError = TransportError::connect("refused").into();
        assert_eq!(err.to_string(), "cannot connect to backend: refused");
    }

    #[test]
    fn dispatch_error_wraps_auth_transparently() {
        let err: DispatchError = AuthError::TokenRejected.into();
        assert_eq!(err.to_string(), "Session token rejected by backend");
    }
}
