//! WebSocket module for real-time chat.
//!
//! Carries the `previous messages` and `chat message` events between
//! browsers and the relay.

pub mod chat;
pub mod messages;

pub use chat::{chat_ws_handler, ChatWsState};
pub use messages::{ClientEvent, ServerEvent};
