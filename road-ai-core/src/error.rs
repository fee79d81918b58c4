//! Error types for road-ai

use thiserror::Error;

/// The main error type for road-ai operations
#[derive(Error, Debug)]
pub enum Error {
    /// Rejected input (blank text and the like)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operation addressed a session that does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A turn is already in flight
    #[error("Busy: a turn is already in flight")]
    Busy,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Provider (LLM) errors
    #[error("Provider error: {0}")]
    Provider(String),
}

/// A specialized Result type for road-ai operations
pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
