//! chatroom - single-room real-time chat.
//!
//! A relay keeps the room history and fans every new message out to all
//! connected subscribers; sessions catch up from a history snapshot and then
//! follow the broadcasts.

pub mod chat;
pub mod config;
pub mod error;
pub mod logging;
pub mod web;

pub use chat::{
    ChatMessage, ChatSession, Color, ColorTable, Key, Relay, RenderedLine, SessionState,
    Subscription,
};
pub use config::Config;
pub use error::{ChatError, Result};
pub use web::WebServer;
