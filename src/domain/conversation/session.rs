//! Session aggregate: one conversation's identity and message history.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{MessageId, SessionId, Timestamp, UserId};

use super::{Message, StateError};

/// One conversation, client side: identifier, owner, and an append-only
/// ordered message sequence.
///
/// # Invariants
///
/// - Message order is exactly append order; nothing reorders or deduplicates
/// - The owner references the credential's subject, never the credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    id: SessionId,
    user_id: UserId,
    messages: Vec<Message>,
    created_at: Timestamp,
    last_activity: Timestamp,
}

impl Session {
    /// Creates a fresh session for the given user with an empty history.
    pub fn new(user_id: UserId) -> Self {
        let now = Timestamp::now();
        Self {
            id: SessionId::new(),
            user_id,
            messages: Vec::new(),
            created_at: now,
            last_activity: now,
        }
    }

    /// Returns the session ID.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Returns the owner's user ID.
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Returns the messages in conversation order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the number of messages.
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Returns the most recent message, if any.
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Returns when the session was created.
    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    /// Returns when the session last changed.
    pub fn last_activity(&self) -> &Timestamp {
        &self.last_activity
    }

    /// Checks if the given user owns this session.
    pub fn is_owner(&self, user_id: &UserId) -> bool {
        &self.user_id == user_id
    }

    /// Appends a message at the tail and returns its ID.
    pub fn push_message(&mut self, message: Message) -> MessageId {
        let id = *message.id();
        self.messages.push(message);
        self.last_activity = Timestamp::now();
        id
    }

    /// Looks up a message by ID for streaming mutation.
    ///
    /// # Errors
    ///
    /// - `MessageNotFound` if no message with this ID exists
    pub fn message_mut(&mut self, id: &MessageId) -> Result<&mut Message, StateError> {
        self.last_activity = Timestamp::now();
        self.messages
            .iter_mut()
            .find(|m| m.id() == id)
            .ok_or(StateError::MessageNotFound(*id))
    }

    /// Looks up a message by ID.
    pub fn message(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user_id() -> UserId {
        UserId::new("user-123").unwrap()
    }

    #[test]
    fn new_session_has_empty_history() {
        let session = Session::new(test_user_id());
        assert!(session.messages().is_empty());
        assert_eq!(session.message_count(), 0);
        assert!(session.last_message().is_none());
    }

    #[test]
    fn new_sessions_get_distinct_ids() {
        let a = Session::new(test_user_id());
        let b = Session::new(test_user_id());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn push_message_preserves_append_order() {
        let mut session = Session::new(test_user_id());
        session.push_message(Message::user("first"));
        session.push_message(Message::user("second"));
        session.push_message(Message::user("third"));

        let contents: Vec<&str> = session.messages().iter().map(|m| m.content()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
    }

    #[test]
    fn push_message_updates_last_activity() {
        let mut session = Session::new(test_user_id());
        let before = *session.last_activity();
        std::thread::sleep(std::time::Duration::from_millis(10));
        session.push_message(Message::user("hi"));
        assert!(session.last_activity().is_after(&before));
    }

    #[test]
    fn message_mut_finds_by_id() {
        let mut session = Session::new(test_user_id());
        let id = session.push_message(Message::assistant_pending());

        let msg = session.message_mut(&id).unwrap();
        msg.push_delta("streamed").unwrap();

        assert_eq!(session.message(&id).unwrap().content(), "streamed");
    }

    #[test]
    fn message_mut_unknown_id_is_not_found() {
        let mut session = Session::new(test_user_id());
        let result = session.message_mut(&MessageId::new());
        assert!(matches!(result, Err(StateError::MessageNotFound(_))));
    }

    #[test]
    fn owner_check_works() {
        let session = Session::new(test_user_id());
        assert!(session.is_owner(&test_user_id()));
        assert!(!session.is_owner(&UserId::new("other").unwrap()));
    }
}
