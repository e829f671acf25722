//! StreamConsumer - turns a chunk stream into exactly one finalized message.
//!
//! The consumer appends an empty, non-final assistant message to the session
//! as soon as the stream opens (so the UI can render partial progress), then
//! folds chunks into it as they arrive:
//!
//! - chunks must arrive with contiguous indices; anything else is a protocol
//!   violation - logged, the stream treated as failed, and the accepted
//!   prefix preserved untouched
//! - the chunk with `done = true` finalizes the message
//! - a transport error element finalizes the message with its partial
//!   content (a partial answer may still have user value)
//! - an aborted stream finalizes the partial content as `Cancelled`,
//!   distinct from transport failure
//! - a stream that ends without any content and without a terminal marker
//!   is an empty response, distinguishable from silence

use std::sync::Arc;

use futures::stream::Abortable;
use futures::StreamExt;

use crate::domain::conversation::{Message, StateError};
use crate::domain::foundation::SessionId;
use crate::ports::{ChunkStream, ProtocolError, StreamError, TransportError};

use super::session::SessionStore;

/// How one stream ended.
#[derive(Debug)]
pub enum StreamFailure {
    /// The transport dropped mid-stream.
    Transport(TransportError),
    /// The stream violated the chunk protocol.
    Protocol(ProtocolError),
    /// The stream was aborted (new send, reset, logout).
    Cancelled,
}

/// Result of consuming one stream. In every variant the message has been
/// finalized in the session.
#[derive(Debug)]
pub enum StreamOutcome {
    /// The stream completed normally with content.
    Completed(Message),
    /// The stream ended with no content at all.
    Empty(Message),
    /// The stream failed; the accepted prefix is preserved in `partial`.
    Failed {
        partial: Message,
        failure: StreamFailure,
    },
}

/// Consumes chunk streams into session messages.
#[derive(Clone)]
pub struct StreamConsumer {
    store: Arc<SessionStore>,
}

impl StreamConsumer {
    /// Creates a consumer writing into the given store.
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self { store }
    }

    /// Consumes the stream to its end (terminal chunk, error element,
    /// abort, or exhaustion) and finalizes the produced message.
    ///
    /// # Errors
    ///
    /// Returns `StateError` when the session is reset or destroyed while the
    /// stream is open - a UI-flow bug, reported rather than swallowed.
    pub async fn consume(
        &self,
        session_id: &SessionId,
        mut stream: Abortable<ChunkStream>,
    ) -> Result<StreamOutcome, StateError> {
        let message_id = self
            .store
            .append_message(session_id, Message::assistant_pending())?;

        let mut next_index: u64 = 0;
        let mut saw_done = false;
        let mut failure: Option<StreamFailure> = None;

        while let Some(item) = stream.next().await {
            match item {
                Ok(chunk) => {
                    if chunk.index != next_index {
                        let violation = if chunk.index < next_index {
                            ProtocolError::DuplicateIndex(chunk.index)
                        } else {
                            ProtocolError::OutOfOrder {
                                expected: next_index,
                                got: chunk.index,
                            }
                        };
                        tracing::warn!(session = %session_id, "{}; abandoning stream", violation);
                        failure = Some(StreamFailure::Protocol(violation));
                        break;
                    }
                    next_index += 1;

                    if chunk.done {
                        saw_done = true;
                        break;
                    }
                    if !chunk.delta.is_empty() {
                        self.store.append_delta(session_id, &message_id, &chunk.delta)?;
                    }
                }
                Err(StreamError::Transport(error)) => {
                    tracing::warn!(session = %session_id, "stream transport failure: {}", error);
                    failure = Some(StreamFailure::Transport(error));
                    break;
                }
                Err(StreamError::Protocol(error)) => {
                    tracing::warn!(session = %session_id, "stream protocol failure: {}", error);
                    failure = Some(StreamFailure::Protocol(error));
                    break;
                }
            }
        }

        if failure.is_none() && !saw_done && stream.is_aborted() {
            tracing::debug!(session = %session_id, "stream cancelled");
            failure = Some(StreamFailure::Cancelled);
        }

        let message = self.store.finalize_message(session_id, &message_id)?;

        let outcome = match failure {
            Some(failure) => StreamOutcome::Failed {
                partial: message,
                failure,
            },
            None if saw_done => {
                if message.content().is_empty() {
                    StreamOutcome::Empty(message)
                } else {
                    StreamOutcome::Completed(message)
                }
            }
            None => {
                // The stream ended without a terminal marker. No content at
                // all means the backend closed immediately; content without
                // the marker means the response was cut off.
                if message.content().is_empty() {
                    StreamOutcome::Empty(message)
                } else {
                    StreamOutcome::Failed {
                        partial: message,
                        failure: StreamFailure::Transport(TransportError::interrupted(
                            "response ended before terminal marker",
                        )),
                    }
                }
            }
        };

        Ok(outcome)
    }
}
