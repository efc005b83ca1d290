//! Chat message and its `"author: text"` wire encoding.

use crate::{ChatError, Result};

/// Separator between author and text on the wire.
pub const WIRE_SEPARATOR: &str = ": ";

/// A chat message.
///
/// Messages are immutable once created. Their position in the relay history
/// is their sequence index; it is not part of the message itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    author: String,
    text: String,
}

impl ChatMessage {
    /// Create a new chat message.
    pub fn new(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            text: text.into(),
        }
    }

    /// Sender's username.
    pub fn author(&self) -> &str {
        &self.author
    }

    /// Message content.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Check that both author and text are non-empty.
    pub fn validate(&self) -> Result<()> {
        if self.author.is_empty() {
            return Err(ChatError::InvalidMessage("empty author".to_string()));
        }
        if self.text.is_empty() {
            return Err(ChatError::InvalidMessage("empty text".to_string()));
        }
        Ok(())
    }

    /// Encode as `"author: text"`.
    pub fn to_wire(&self) -> String {
        format!("{}{}{}", self.author, WIRE_SEPARATOR, self.text)
    }

    /// Decode an `"author: text"` string.
    ///
    /// Splits on the first separator, so an author containing `": "` is
    /// misattributed. Without any separator the whole string is the author
    /// and the text is empty.
    pub fn from_wire(raw: &str) -> Self {
        match raw.split_once(WIRE_SEPARATOR) {
            Some((author, text)) => Self::new(author, text),
            None => Self::new(raw, ""),
        }
    }
}

impl std::fmt::Display for ChatMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}{}", self.author, WIRE_SEPARATOR, self.text)
    }
}
