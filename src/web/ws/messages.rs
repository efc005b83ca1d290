//! WebSocket event envelopes.
//!
//! Every text frame carries one JSON object `{"event": <name>, "data": <payload>}`.
//! Chat messages inside the payload use the `"author: text"` encoding.

use serde::{Deserialize, Serialize};

use crate::chat::ChatMessage;

/// Events sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    /// Submit a message to the room.
    #[serde(rename = "chat message")]
    ChatMessage(String),
}

impl ClientEvent {
    /// Wrap a message for submission.
    pub fn chat_message(message: &ChatMessage) -> Self {
        Self::ChatMessage(message.to_wire())
    }
}

/// Events sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    /// History snapshot, sent once right after the connection opens.
    #[serde(rename = "previous messages")]
    PreviousMessages(Vec<String>),
    /// A newly posted message, echoed to its sender as well.
    #[serde(rename = "chat message")]
    ChatMessage(String),
}

impl ServerEvent {
    /// Build the history snapshot event.
    pub fn previous_messages(history: &[ChatMessage]) -> Self {
        Self::PreviousMessages(history.iter().map(ChatMessage::to_wire).collect())
    }

    /// Build a broadcast event.
    pub fn chat_message(message: &ChatMessage) -> Self {
        Self::ChatMessage(message.to_wire())
    }

    /// Decode the carried messages.
    pub fn messages(&self) -> Vec<ChatMessage> {
        match self {
            Self::PreviousMessages(raw) => raw.iter().map(|s| ChatMessage::from_wire(s)).collect(),
            Self::ChatMessage(raw) => vec![ChatMessage::from_wire(raw)],
        }
    }
}
