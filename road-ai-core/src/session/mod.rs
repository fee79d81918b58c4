//! Chat sessions and the store that owns them
//!
//! Sessions live in memory only. The store is the single authority on
//! which sessions exist and which one is active.

pub mod manager;
pub mod store;

pub use manager::{SessionStore, SharedSessionStore};
pub use store::{ChatSession, Message, Role, SessionId, DEFAULT_TITLE, TITLE_MAX_CHARS};
