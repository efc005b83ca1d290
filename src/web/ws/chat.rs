//! Chat WebSocket handler.
//!
//! Bridges one WebSocket connection to one relay subscription: the history
//! snapshot goes out first, then every broadcast, while incoming
//! `chat message` events are posted to the relay.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;

use crate::chat::{ChatMessage, Relay, SubscriberId};
use crate::{ChatError, Result};

use super::messages::{ClientEvent, ServerEvent};

/// State for the WebSocket chat handler.
#[derive(Clone)]
pub struct ChatWsState {
    /// The room relay.
    pub relay: Relay,
}

impl ChatWsState {
    /// Create a new chat WebSocket state.
    pub fn new(relay: Relay) -> Self {
        Self { relay }
    }
}

/// WebSocket chat handler.
///
/// GET /ws
pub async fn chat_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ChatWsState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle a WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Arc<ChatWsState>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let (snapshot, mut subscription) = state.relay.connect();
    let subscriber = subscription.id();
    tracing::info!(
        subscriber = %subscriber,
        history = snapshot.len(),
        "WebSocket session started"
    );

    let previous = ServerEvent::previous_messages(&snapshot);
    if let Err(e) = send_event(&mut ws_sender, subscriber, &previous).await {
        tracing::debug!(error = %e, "Failed to send history snapshot");
        return;
    }

    loop {
        tokio::select! {
            incoming = ws_receiver.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        handle_client_text(&state.relay, subscriber, &text);
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if ws_sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::debug!(subscriber = %subscriber, "WebSocket closed by client");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(subscriber = %subscriber, error = %e, "WebSocket error");
                        break;
                    }
                }
            }

            broadcast = subscription.recv() => {
                match broadcast {
                    Some(message) => {
                        let event = ServerEvent::chat_message(&message);
                        if let Err(e) = send_event(&mut ws_sender, subscriber, &event).await {
                            tracing::debug!(error = %e, "Failed to forward broadcast");
                            break;
                        }
                    }
                    None => {
                        tracing::info!(subscriber = %subscriber, "Relay dropped subscriber");
                        let _ = ws_sender.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
        }
    }

    drop(subscription);
    tracing::info!(subscriber = %subscriber, "WebSocket session ended");
}

/// Decode a client frame and post its message. Bad input is ignored.
fn handle_client_text(relay: &Relay, subscriber: SubscriberId, text: &str) {
    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!(subscriber = %subscriber, error = %e, "Ignoring unparseable frame");
            return;
        }
    };

    match event {
        ClientEvent::ChatMessage(raw) => {
            if let Err(e) = relay.post(ChatMessage::from_wire(&raw)) {
                tracing::debug!(subscriber = %subscriber, error = %e, "Ignoring message");
            }
        }
    }
}

/// Serialize and send one event.
async fn send_event(
    ws_sender: &mut SplitSink<WebSocket, Message>,
    subscriber: SubscriberId,
    event: &ServerEvent,
) -> Result<()> {
    let json = serde_json::to_string(event)?;
    ws_sender
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| ChatError::ChannelUnavailable(subscriber.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_client_text_posts() {
        let relay = Relay::default();
        let id = SubscriberId::new_v4();

        handle_client_text(&relay, id, r#"{"event":"chat message","data":"alice: hi"}"#);
        assert_eq!(relay.history(), vec![ChatMessage::new("alice", "hi")]);
    }

    #[test]
    fn test_handle_client_text_ignores_garbage() {
        let relay = Relay::default();
        let id = SubscriberId::new_v4();

        handle_client_text(&relay, id, "not json");
        handle_client_text(&relay, id, r#"{"event":"chat message","data":"no separator"}"#);
        handle_client_text(&relay, id, r#"{"event":"chat message","data":"alice: "}"#);
        handle_client_text(&relay, id, r#"{"event":"chat message","data":": hi"}"#);

        assert_eq!(relay.history_len(), 0);
    }

    #[test]
    fn test_chat_ws_state_new() {
        let relay = Relay::default();
        let state = ChatWsState::new(relay.clone());
        state.relay.post(ChatMessage::new("alice", "hi")).unwrap();
        assert_eq!(relay.history_len(), 1);
    }
}
