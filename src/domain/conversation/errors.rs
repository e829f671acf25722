//! State errors: operations against sessions or messages that no longer
//! accept them.
//!
//! These surface UI-flow bugs (append after reset, mutate after finalize),
//! not user-recoverable conditions.

use thiserror::Error;

use crate::domain::foundation::{MessageId, SessionId};

/// Operation attempted against state that no longer exists or no longer
/// accepts mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// No session is active.
    #[error("no active session")]
    NoSession,

    /// The targeted session was reset or replaced while the operation was in
    /// flight.
    #[error("session {0} has been reset or replaced")]
    SessionGone(SessionId),

    /// The targeted message does not exist in the session.
    #[error("message {0} not found in session")]
    MessageNotFound(MessageId),

    /// The targeted message is final and immutable.
    #[error("message {0} is already finalized")]
    MessageFinalized(MessageId),
}
