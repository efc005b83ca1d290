//! Router configuration for the chat server.

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::chat::Relay;

use super::ws::{chat_ws_handler, ChatWsState};

/// Create the main router: the chat WebSocket plus the health check.
pub fn create_router(relay: Relay) -> Router {
    let state = Arc::new(ChatWsState::new(relay));

    Router::new()
        .route("/ws", get(chat_ws_handler))
        .with_state(state)
        .merge(create_health_router())
        .layer(TraceLayer::new_for_http())
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}
