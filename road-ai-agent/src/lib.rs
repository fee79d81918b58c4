//! Conversation logic for road-ai
//!
//! This crate provides the driver that runs a user turn against the remote
//! model and writes the outcome back into the session that asked.

pub mod driver;

pub use driver::{ConversationDriver, TurnOutcome};
