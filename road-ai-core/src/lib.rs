//! Core types and state for road-ai
//!
//! This crate provides the session store, the chat data model, the
//! reference document and the configuration/logging plumbing shared by
//! the other road-ai crates.

pub mod config;
pub mod error;
pub mod knowledge;
pub mod logging;
pub mod session;
pub mod utils;

pub use error::{Error, Result};
