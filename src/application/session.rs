//! SessionStore - owns the process-wide current session.
//!
//! One session is active at a time. All mutations are keyed by `SessionId`
//! so an operation racing a reset is detected instead of silently landing in
//! the wrong conversation: if the store's current session no longer matches
//! the caller's ID, the operation fails with `StateError::SessionGone`.
//!
//! The lock is a `std::sync::RwLock`; no mutation crosses an await point.

use std::sync::RwLock;

use crate::domain::conversation::{Message, Session, StateError};
use crate::domain::foundation::{MessageId, SessionId, UserId};

/// In-process store for the active conversation.
#[derive(Default)]
pub struct SessionStore {
    current: RwLock<Option<Session>>,
}

impl SessionStore {
    /// Creates a store with no active session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a fresh session for `owner`, replacing any current one.
    /// Returns a snapshot of the new session.
    pub fn create_session(&self, owner: UserId) -> Session {
        let session = Session::new(owner);
        tracing::info!(session = %session.id(), "session created");
        *self.current.write().unwrap() = Some(session.clone());
        session
    }

    /// Returns a snapshot of the current session, if any.
    pub fn current_session(&self) -> Option<Session> {
        self.current.read().unwrap().clone()
    }

    /// Returns the current session's ID, if any.
    pub fn current_session_id(&self) -> Option<SessionId> {
        self.current.read().unwrap().as_ref().map(|s| *s.id())
    }

    /// Appends a message at the tail of the session and returns its ID.
    ///
    /// # Errors
    ///
    /// - `NoSession` / `SessionGone` if the session was reset or destroyed
    ///   concurrently with the append
    pub fn append_message(
        &self,
        session_id: &SessionId,
        message: Message,
    ) -> Result<MessageId, StateError> {
        self.with_session(session_id, |session| Ok(session.push_message(message)))
    }

    /// Appends a streamed fragment to an in-progress message.
    ///
    /// # Errors
    ///
    /// - `SessionGone` if the session was reset mid-stream
    /// - `MessageFinalized` if the message is already final
    pub fn append_delta(
        &self,
        session_id: &SessionId,
        message_id: &MessageId,
        delta: &str,
    ) -> Result<(), StateError> {
        self.with_session(session_id, |session| {
            session.message_mut(message_id)?.push_delta(delta)
        })
    }

    /// Marks a message final and returns a snapshot of it.
    pub fn finalize_message(
        &self,
        session_id: &SessionId,
        message_id: &MessageId,
    ) -> Result<Message, StateError> {
        self.with_session(session_id, |session| {
            let message = session.message_mut(message_id)?;
            message.finalize()?;
            Ok(message.clone())
        })
    }

    /// Starts a new conversation for the same owner.
    ///
    /// The old history is discarded and a **new** session ID is issued (a
    /// conversation's identity is its ID; anything still streaming into the
    /// old one fails with `SessionGone`). Returns a snapshot of the fresh
    /// session.
    ///
    /// # Errors
    ///
    /// - `NoSession` if there is nothing to reset
    pub fn reset(&self) -> Result<Session, StateError> {
        let mut guard = self.current.write().unwrap();
        let old = guard.as_ref().ok_or(StateError::NoSession)?;
        let fresh = Session::new(old.user_id().clone());
        tracing::info!(old = %old.id(), new = %fresh.id(), "session reset");
        *guard = Some(fresh.clone());
        Ok(fresh)
    }

    /// Destroys the current session, if any. Used on logout.
    pub fn clear(&self) {
        *self.current.write().unwrap() = None;
    }

    fn with_session<T>(
        &self,
        session_id: &SessionId,
        f: impl FnOnce(&mut Session) -> Result<T, StateError>,
    ) -> Result<T, StateError> {
        let mut guard = self.current.write().unwrap();
        match guard.as_mut() {
            None => Err(StateError::NoSession),
            Some(session) if session.id() != session_id => {
                Err(StateError::SessionGone(*session_id))
            }
            Some(session) => f(session),
        }
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("current", &self.current_session_id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> UserId {
        UserId::new("user-123").unwrap()
    }

    #[test]
    fn create_session_becomes_current() {
        let store = SessionStore::new();
        let session = store.create_session(owner());
        assert_eq!(store.current_session_id(), Some(*session.id()));
    }

    #[test]
    fn create_session_replaces_previous() {
        let store = SessionStore::new();
        let first = store.create_session(owner());
        let second = store.create_session(owner());

        assert_ne!(first.id(), second.id());
        assert_eq!(store.current_session_id(), Some(*second.id()));
    }

    #[test]
    fn append_message_preserves_insertion_order() {
        let store = SessionStore::new();
        let session = store.create_session(owner());

        store
            .append_message(session.id(), Message::user("A"))
            .unwrap();
        store
            .append_message(session.id(), Message::user("B"))
            .unwrap();

        let current = store.current_session().unwrap();
        let contents: Vec<&str> = current.messages().iter().map(|m| m.content()).collect();
        assert_eq!(contents, vec!["A", "B"]);
    }

    #[test]
    fn append_without_session_fails() {
        let store = SessionStore::new();
        let result = store.append_message(&SessionId::new(), Message::user("hi"));
        assert!(matches!(result, Err(StateError::NoSession)));
    }

    #[test]
    fn append_after_reset_fails_with_session_gone() {
        let store = SessionStore::new();
        let session = store.create_session(owner());
        store.reset().unwrap();

        let result = store.append_message(session.id(), Message::user("late"));
        assert!(matches!(result, Err(StateError::SessionGone(_))));
    }

    #[test]
    fn reset_issues_new_id_and_empties_history() {
        let store = SessionStore::new();
        let session = store.create_session(owner());
        store
            .append_message(session.id(), Message::user("hi"))
            .unwrap();

        let fresh = store.reset().unwrap();

        assert_ne!(fresh.id(), session.id());
        assert_eq!(fresh.user_id(), &owner());
        assert!(fresh.messages().is_empty());
    }

    #[test]
    fn reset_without_session_fails() {
        let store = SessionStore::new();
        assert!(matches!(store.reset(), Err(StateError::NoSession)));
    }

    #[test]
    fn append_delta_streams_into_pending_message() {
        let store = SessionStore::new();
        let session = store.create_session(owner());
        let id = store
            .append_message(session.id(), Message::assistant_pending())
            .unwrap();

        store.append_delta(session.id(), &id, "Hello, ").unwrap();
        store.append_delta(session.id(), &id, "world").unwrap();

        let current = store.current_session().unwrap();
        assert_eq!(current.message(&id).unwrap().content(), "Hello, world");
        assert!(!current.message(&id).unwrap().is_final());
    }

    #[test]
    fn append_delta_after_reset_fails() {
        let store = SessionStore::new();
        let session = store.create_session(owner());
        let id = store
            .append_message(session.id(), Message::assistant_pending())
            .unwrap();
        store.reset().unwrap();

        let result = store.append_delta(session.id(), &id, "late");
        assert!(matches!(result, Err(StateError::SessionGone(_))));
    }

    #[test]
    fn finalize_message_returns_final_snapshot() {
        let store = SessionStore::new();
        let session = store.create_session(owner());
        let id = store
            .append_message(session.id(), Message::assistant_pending())
            .unwrap();
        store.append_delta(session.id(), &id, "done").unwrap();

        let message = store.finalize_message(session.id(), &id).unwrap();
        assert!(message.is_final());
        assert_eq!(message.content(), "done");
    }

    #[test]
    fn delta_into_finalized_message_fails() {
        let store = SessionStore::new();
        let session = store.create_session(owner());
        let id = store
            .append_message(session.id(), Message::assistant_pending())
            .unwrap();
        store.finalize_message(session.id(), &id).unwrap();

        let result = store.append_delta(session.id(), &id, "more");
        assert!(matches!(result, Err(StateError::MessageFinalized(_))));
    }

    #[test]
    fn clear_destroys_current_session() {
        let store = SessionStore::new();
        store.create_session(owner());
        store.clear();
        assert!(store.current_session().is_none());
    }
}
