//! Client-side chat session.
//!
//! A session starts logged out. Logging in with a non-empty username connects
//! it to the relay, seeds the local view from the history snapshot and from
//! then on appends every broadcast in arrival order. Outgoing messages are
//! never appended locally: the relay echoes them back like any other message,
//! so the local view always follows the relay's order.

use super::color::{Color, ColorTable};
use super::message::ChatMessage;
use super::relay::{Relay, Subscription, TryRecvError};

/// Number of header activations that clears the local view.
pub const HEADER_CLEAR_CLICKS: u8 = 5;

/// Login state of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Showing the login form.
    LoggedOut,
    /// In the room. There is no way back to `LoggedOut`.
    LoggedIn {
        /// Username chosen at login.
        username: String,
    },
}

/// A key press in the message input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Submit the draft.
    Enter,
    /// Delete the last character of the draft.
    Backspace,
    /// Append a character to the draft.
    Char(char),
}

/// One message as presented in the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLine {
    /// Author name.
    pub author: String,
    /// Message content.
    pub text: String,
    /// Background color for the author name.
    pub color: Color,
}

/// One participant's view of the chat room.
pub struct ChatSession {
    relay: Relay,
    state: SessionState,
    subscription: Option<Subscription>,
    view: Vec<ChatMessage>,
    colors: ColorTable,
    header_clicks: u8,
    draft: String,
    /// Bumped on every change to `view`; nothing else touches it.
    view_version: u64,
    scroll_pending: bool,
}

impl ChatSession {
    /// Create a logged-out session bound to `relay`.
    pub fn new(relay: Relay) -> Self {
        Self::with_colors(relay, ColorTable::new())
    }

    /// Create a session with a custom color table.
    pub fn with_colors(relay: Relay, colors: ColorTable) -> Self {
        Self {
            relay,
            state: SessionState::LoggedOut,
            subscription: None,
            view: Vec::new(),
            colors,
            header_clicks: 0,
            draft: String::new(),
            view_version: 0,
            scroll_pending: false,
        }
    }

    /// Current login state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Username, once logged in.
    pub fn username(&self) -> Option<&str> {
        match &self.state {
            SessionState::LoggedIn { username } => Some(username),
            SessionState::LoggedOut => None,
        }
    }

    /// Whether the session has logged in.
    pub fn is_logged_in(&self) -> bool {
        matches!(self.state, SessionState::LoggedIn { .. })
    }

    /// Whether the session still holds a live subscription.
    pub fn is_connected(&self) -> bool {
        self.subscription.is_some()
    }

    /// Log in and join the room.
    ///
    /// Does nothing for an empty username or when already logged in.
    /// Returns true if the session logged in.
    pub fn login(&mut self, candidate: &str) -> bool {
        if candidate.is_empty() || self.is_logged_in() {
            return false;
        }

        self.state = SessionState::LoggedIn {
            username: candidate.to_string(),
        };
        tracing::info!(username = candidate, "Session logged in");
        self.connect();
        true
    }

    /// Drop the current subscription (if any) and connect again.
    ///
    /// The local view is replaced by a fresh history snapshot. Returns false
    /// while logged out.
    pub fn reconnect(&mut self) -> bool {
        if !self.is_logged_in() {
            return false;
        }
        self.subscription = None;
        self.connect();
        true
    }

    fn connect(&mut self) {
        let (snapshot, subscription) = self.relay.connect();
        tracing::debug!(
            subscriber = %subscription.id(),
            history = snapshot.len(),
            "Session connected"
        );
        self.subscription = Some(subscription);
        self.view = snapshot;
        self.touch_view();
    }

    fn detach(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            tracing::warn!(subscriber = %subscription.id(), "Relay closed the subscription");
        }
    }

    fn touch_view(&mut self) {
        self.view_version += 1;
        self.scroll_pending = true;
    }

    /// Outgoing text buffer.
    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Replace the outgoing text buffer.
    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Handle a key press in the message input.
    ///
    /// Returns true if the key sent a message.
    pub fn handle_key(&mut self, key: Key) -> bool {
        match key {
            Key::Enter => self.send_draft(),
            Key::Backspace => {
                self.draft.pop();
                false
            }
            Key::Char(c) => {
                self.draft.push(c);
                false
            }
        }
    }

    /// Send the outgoing text buffer.
    pub fn send_draft(&mut self) -> bool {
        let text = self.draft.clone();
        self.send_message(&text)
    }

    /// Post `text` to the room under this session's username.
    ///
    /// Does nothing for empty text or while logged out. Otherwise clears the
    /// outgoing buffer; the message shows up in the local view once the relay
    /// echoes it. Returns true if the relay accepted the message.
    pub fn send_message(&mut self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        let Some(username) = self.username() else {
            return false;
        };

        let message = ChatMessage::new(username, text);
        let posted = match self.relay.post(message) {
            Ok(seq) => {
                tracing::trace!(seq, "Message posted");
                true
            }
            Err(e) => {
                tracing::debug!(error = %e, "Message rejected");
                false
            }
        };
        self.draft.clear();
        posted
    }

    /// Append a broadcast message to the local view.
    pub fn on_broadcast_received(&mut self, message: ChatMessage) {
        self.view.push(message);
        self.touch_view();
    }

    /// Apply every broadcast already queued for this session.
    ///
    /// Never waits. Returns the number of messages applied.
    pub fn sync(&mut self) -> usize {
        let mut applied = 0;
        loop {
            let next = match self.subscription.as_mut() {
                Some(subscription) => subscription.try_recv(),
                None => break,
            };
            match next {
                Ok(message) => {
                    self.on_broadcast_received(message);
                    applied += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.detach();
                    break;
                }
            }
        }
        applied
    }

    /// Wait for the next broadcast and apply it.
    ///
    /// Returns false if the session has no live subscription.
    pub async fn next_broadcast(&mut self) -> bool {
        let Some(subscription) = self.subscription.as_mut() else {
            return false;
        };
        match subscription.recv().await {
            Some(message) => {
                self.on_broadcast_received(message);
                true
            }
            None => {
                self.detach();
                false
            }
        }
    }

    /// Display color for `username`, stable for this session.
    pub fn resolve_color(&mut self, username: &str) -> Color {
        self.colors.resolve(username)
    }

    /// Register a click on the room header.
    ///
    /// Every fifth click clears the local view. The relay history is not
    /// affected. Returns true if the view was cleared.
    pub fn register_header_activation(&mut self) -> bool {
        self.header_clicks += 1;
        if self.header_clicks < HEADER_CLEAR_CLICKS {
            return false;
        }

        self.header_clicks = 0;
        self.view.clear();
        self.touch_view();
        tracing::debug!("Local view cleared");
        true
    }

    /// Header clicks counted toward the next clear.
    pub fn header_clicks(&self) -> u8 {
        self.header_clicks
    }

    /// Messages currently shown, oldest first.
    pub fn local_view(&self) -> &[ChatMessage] {
        &self.view
    }

    /// Redraw counter. Changes only when the local view changes.
    pub fn view_version(&self) -> u64 {
        self.view_version
    }

    /// Consume a pending "scroll to latest" request.
    pub fn take_scroll_request(&mut self) -> bool {
        std::mem::take(&mut self.scroll_pending)
    }

    /// Render the local view, assigning colors to new authors as they appear.
    pub fn rendered_lines(&mut self) -> Vec<RenderedLine> {
        self.view
            .iter()
            .map(|message| RenderedLine {
                author: message.author().to_string(),
                text: message.text().to_string(),
                color: self.colors.resolve(message.author()),
            })
            .collect()
    }
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("state", &self.state)
            .field("connected", &self.subscription.is_some())
            .field("view", &self.view.len())
            .field("header_clicks", &self.header_clicks)
            .finish_non_exhaustive()
    }
}
