//! Error types for the chat relay.

use thiserror::Error;

/// Common error type for the chat relay.
#[derive(Error, Debug)]
pub enum ChatError {
    /// A message was rejected before it reached the history.
    ///
    /// Raised when the author or the text is empty.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// A subscriber's delivery path is broken (receiver gone or queue full).
    #[error("channel unavailable for subscriber {0}")]
    ChannelUnavailable(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Validation error for configuration or user input.
    #[error("validation error: {0}")]
    Validation(String),
}

/// Result type alias for chat operations.
pub type Result<T> = std::result::Result<T, ChatError>;
