//! Session data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::{monotonic_millis, truncate_chars};

/// Title given to a session before its first user message
pub const DEFAULT_TITLE: &str = "New Discussion";

/// Characters of the first user message kept in a derived title
pub const TITLE_MAX_CHARS: usize = 25;

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message author
    pub role: Role,
    /// Message content
    pub text: String,
    /// Milliseconds since the epoch; unique and increasing within a session
    pub timestamp: i64,
}

impl Message {
    /// Create a message stamped with the current time
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp: monotonic_millis(),
        }
    }

    /// Create a user message
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    /// Create a model message
    pub fn model(text: impl Into<String>) -> Self {
        Self::new(Role::Model, text)
    }

    /// Wall-clock time of the message, for display
    pub fn time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }
}

/// Opaque, never-reused session identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A conversation session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    /// Immutable identifier
    pub id: SessionId,
    /// Display label, derived once from the first user message
    pub title: String,
    /// Messages in insertion order
    pub messages: Vec<Message>,
    /// Session creation time
    pub created_at: DateTime<Utc>,
}

impl ChatSession {
    /// Create an empty session
    pub fn new(id: SessionId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            messages: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Append a message, deriving the title when it is the first user
    /// message of an empty session. Returns the stored message.
    pub(crate) fn push(&mut self, mut message: Message, title_max_chars: usize) -> &Message {
        if self.messages.is_empty() && message.role == Role::User {
            self.title = derive_title(&message.text, title_max_chars);
        }

        if let Some(last) = self.messages.last() {
            if message.timestamp <= last.timestamp {
                message.timestamp = last.timestamp + 1;
            }
        }

        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }
}

/// Title for a session whose first user message is `text`
pub fn derive_title(text: &str, max_chars: usize) -> String {
    truncate_chars(text, max_chars)
}
