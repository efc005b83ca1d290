//! Web module.
//!
//! This module exposes the relay over WebSocket and serves a health check.

pub mod router;
pub mod server;
pub mod ws;

pub use router::create_router;
pub use server::WebServer;
