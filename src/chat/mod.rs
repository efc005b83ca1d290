//! Chat module.
//!
//! This module provides the single chat room:
//! - The relay holding history and broadcasting to subscribers
//! - Chat messages and their wire encoding
//! - Client sessions with their local view and color table

mod color;
mod message;
mod relay;
mod session;

pub use color::{Color, ColorTable};
pub use message::{ChatMessage, WIRE_SEPARATOR};
pub use relay::{Relay, SubscriberId, Subscription, TryRecvError};
pub use session::{ChatSession, Key, RenderedLine, SessionState, HEADER_CLEAR_CLICKS};
