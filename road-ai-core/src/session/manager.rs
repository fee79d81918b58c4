//! Session store for handling multiple sessions

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::store::{ChatSession, Message, SessionId, DEFAULT_TITLE, TITLE_MAX_CHARS};
use crate::{Error, Result};

/// A session store shared between the UI and in-flight turns.
///
/// Guards are short-lived and must never be held across an `.await`.
pub type SharedSessionStore = Arc<RwLock<SessionStore>>;

/// Owns every chat session and the active-session pointer
#[derive(Debug)]
pub struct SessionStore {
    /// Sessions in creation order (oldest first)
    sessions: Vec<ChatSession>,
    /// Position of each session in `sessions`
    index: HashMap<SessionId, usize>,
    /// Currently active session
    active: Option<SessionId>,
    default_title: String,
    title_max_chars: usize,
}

impl SessionStore {
    /// Create an empty store with the default title rules
    pub fn new() -> Self {
        Self::with_title_rules(DEFAULT_TITLE, TITLE_MAX_CHARS)
    }

    /// Create an empty store with a custom placeholder title and
    /// derived-title length
    pub fn with_title_rules(default_title: impl Into<String>, title_max_chars: usize) -> Self {
        Self {
            sessions: Vec::new(),
            index: HashMap::new(),
            active: None,
            default_title: default_title.into(),
            title_max_chars,
        }
    }

    /// Wrap the store for sharing across tasks
    pub fn into_shared(self) -> SharedSessionStore {
        Arc::new(RwLock::new(self))
    }

    /// Create a new empty session and make it active
    pub fn create_session(&mut self) -> SessionId {
        let id = SessionId::generate();
        self.index.insert(id.clone(), self.sessions.len());
        self.sessions
            .push(ChatSession::new(id.clone(), self.default_title.clone()));
        self.active = Some(id.clone());
        debug!("Created session {}", id);
        id
    }

    /// Append a message to a session, whether or not it is active
    pub fn append_message(&mut self, id: &SessionId, message: Message) -> Result<&Message> {
        let title_max_chars = self.title_max_chars;
        let session = self.get_mut(id)?;
        let stored = session.push(message, title_max_chars);
        debug!("Appended {} message to session {}", stored.role, id);
        Ok(stored)
    }

    /// Switch the active session
    pub fn set_active(&mut self, id: &SessionId) -> Result<()> {
        if !self.index.contains_key(id) {
            return Err(not_found(id));
        }
        self.active = Some(id.clone());
        Ok(())
    }

    /// The active session, if any
    pub fn active(&self) -> Option<&ChatSession> {
        self.active.as_ref().and_then(|id| self.get(id))
    }

    /// Identifier of the active session, if any
    pub fn active_id(&self) -> Option<&SessionId> {
        self.active.as_ref()
    }

    /// Sessions, most recently created first
    pub fn list(&self) -> impl Iterator<Item = &ChatSession> + '_ {
        self.sessions.iter().rev()
    }

    /// Get a session if it exists
    pub fn get(&self, id: &SessionId) -> Option<&ChatSession> {
        self.index.get(id).map(|&pos| &self.sessions[pos])
    }

    /// Copy of a session's message history
    pub fn history(&self, id: &SessionId) -> Result<Vec<Message>> {
        self.get(id)
            .map(|session| session.messages.clone())
            .ok_or_else(|| not_found(id))
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn get_mut(&mut self, id: &SessionId) -> Result<&mut ChatSession> {
        match self.index.get(id) {
            Some(&pos) => Ok(&mut self.sessions[pos]),
            None => Err(not_found(id)),
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(id: &SessionId) -> Error {
    Error::NotFound(format!("session {}", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Role;
    use std::collections::HashSet;

    #[test]
    fn test_empty_store() {
        let store = SessionStore::new();
        assert!(store.is_empty());
        assert!(store.active().is_none());
        assert_eq!(store.list().count(), 0);
    }

    #[test]
    fn test_create_session_is_unique_and_active() {
        let mut store = SessionStore::new();
        let mut seen = HashSet::new();
        for _ in 0..50 {
            let id = store.create_session();
            assert!(seen.insert(id.clone()));
            assert_eq!(store.active_id(), Some(&id));
            assert_eq!(store.active().unwrap().title, "New Discussion");
        }
        assert_eq!(store.len(), 50);
    }

    #[test]
    fn test_list_is_newest_first() {
        let mut store = SessionStore::new();
        let a = store.create_session();
        let b = store.create_session();
        let c = store.create_session();

        let ids: Vec<_> = store.list().map(|s| s.id.clone()).collect();
        assert_eq!(ids, vec![c, b, a]);
    }

    #[test]
    fn test_first_user_message_sets_title_once() {
        let mut store = SessionStore::new();
        let id = store.create_session();

        store
            .append_message(&id, Message::user("Embankment density?"))
            .unwrap();
        store.append_message(&id, Message::model("1.7 g/cu.cm")).unwrap();
        store
            .append_message(&id, Message::user("And for subgrade layers?"))
            .unwrap();

        assert_eq!(store.get(&id).unwrap().title, "Embankment density?");
    }

    #[test]
    fn test_long_first_message_is_truncated() {
        let mut store = SessionStore::new();
        let id = store.create_session();
        store
            .append_message(&id, Message::user("Minimum lane width for 1-way construction traffic?"))
            .unwrap();
        assert_eq!(store.get(&id).unwrap().title, "Minimum lane width for 1-...");
    }

    #[test]
    fn test_model_first_message_leaves_title() {
        let mut store = SessionStore::new();
        let id = store.create_session();
        store.append_message(&id, Message::model("Hello")).unwrap();
        store.append_message(&id, Message::user("Question")).unwrap();
        assert_eq!(store.get(&id).unwrap().title, "New Discussion");
    }

    #[test]
    fn test_append_preserves_order() {
        let mut store = SessionStore::new();
        let id = store.create_session();
        let sent: Vec<Message> = (0..10)
            .map(|i| {
                if i % 2 == 0 {
                    Message::user(format!("q{}", i))
                } else {
                    Message::model(format!("a{}", i))
                }
            })
            .collect();

        for msg in &sent {
            store.append_message(&id, msg.clone()).unwrap();
        }

        assert_eq!(store.history(&id).unwrap(), sent);
    }

    #[test]
    fn test_append_to_inactive_session() {
        let mut store = SessionStore::new();
        let a = store.create_session();
        let b = store.create_session();

        store.append_message(&a, Message::user("for a")).unwrap();

        assert_eq!(store.active_id(), Some(&b));
        assert_eq!(store.get(&a).unwrap().messages.len(), 1);
        assert!(store.get(&b).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_session_is_not_found() {
        let mut store = SessionStore::new();
        let known = store.create_session();
        let unknown = SessionId::from("missing");

        let err = store
            .append_message(&unknown, Message::user("hi"))
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let err = store.set_active(&unknown).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(store.active_id(), Some(&known));
        assert!(store.history(&unknown).is_err());
    }

    #[test]
    fn test_set_active_switches() {
        let mut store = SessionStore::new();
        let a = store.create_session();
        let _b = store.create_session();
        store.set_active(&a).unwrap();
        assert_eq!(store.active().unwrap().id, a);
    }

    #[test]
    fn test_reads_are_idempotent() {
        let mut store = SessionStore::new();
        let id = store.create_session();
        store.append_message(&id, Message::user("hi")).unwrap();
        store.create_session();

        let first: Vec<_> = store.list().map(|s| (s.id.clone(), s.messages.len())).collect();
        let second: Vec<_> = store.list().map(|s| (s.id.clone(), s.messages.len())).collect();
        assert_eq!(first, second);
        assert_eq!(
            store.active().map(|s| s.id.clone()),
            store.active().map(|s| s.id.clone())
        );
    }

    #[test]
    fn test_timestamps_unique_within_session() {
        let mut store = SessionStore::new();
        let id = store.create_session();
        for i in 0..100 {
            store
                .append_message(&id, Message::new(Role::User, i.to_string()))
                .unwrap();
        }
        let history = store.history(&id).unwrap();
        assert!(history.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[test]
    fn test_custom_title_rules() {
        let mut store = SessionStore::with_title_rules("Untitled", 4);
        let id = store.create_session();
        assert_eq!(store.get(&id).unwrap().title, "Untitled");
        store.append_message(&id, Message::user("Piling")).unwrap();
        assert_eq!(store.get(&id).unwrap().title, "Pili...");
    }
}
