//! Message entity: one turn of a conversation.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{MessageId, Timestamp};

use super::StateError;

/// Role of the message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System note injected by the client (e.g., reset markers).
    System,
    /// User input.
    User,
    /// Assistant (backend agent) response.
    Assistant,
}

/// One message in a session.
///
/// # Invariants
///
/// - Content is mutable only while the message is streaming
/// - Once `is_final()` returns true the message is never mutated again;
///   `push_delta` and `finalize` reject further changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    role: MessageRole,
    content: String,
    created_at: Timestamp,
    #[serde(rename = "final")]
    is_final: bool,
}

impl Message {
    /// Creates a user message. User messages are complete the moment they
    /// are submitted, so they are born final.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            role: MessageRole::User,
            content: content.into(),
            created_at: Timestamp::now(),
            is_final: true,
        }
    }

    /// Creates a system message (born final).
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            role: MessageRole::System,
            content: content.into(),
            created_at: Timestamp::now(),
            is_final: true,
        }
    }

    /// Creates an empty, non-final assistant message to stream into.
    pub fn assistant_pending() -> Self {
        Self {
            id: MessageId::new(),
            role: MessageRole::Assistant,
            content: String::new(),
            created_at: Timestamp::now(),
            is_final: false,
        }
    }

    /// Returns the message ID.
    pub fn id(&self) -> &MessageId {
        &self.id
    }

    /// Returns who sent this message.
    pub fn role(&self) -> MessageRole {
        self.role
    }

    /// Returns the message content (partial while streaming).
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Returns when the message was created.
    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    /// Returns true once the content is complete and immutable.
    pub fn is_final(&self) -> bool {
        self.is_final
    }

    /// Appends a streamed content fragment.
    ///
    /// # Errors
    ///
    /// - `MessageFinalized` if the message is already final
    pub fn push_delta(&mut self, delta: &str) -> Result<(), StateError> {
        if self.is_final {
            return Err(StateError::MessageFinalized(self.id));
        }
        self.content.push_str(delta);
        Ok(())
    }

    /// Marks the content complete. The message is immutable afterwards.
    ///
    /// # Errors
    ///
    /// - `MessageFinalized` if already final
    pub fn finalize(&mut self) -> Result<(), StateError> {
        if self.is_final {
            return Err(StateError::MessageFinalized(self.id));
        }
        self.is_final = true;
        Ok(())
    }
}
