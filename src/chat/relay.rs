//! Broadcast relay for the chat room.
//!
//! The relay owns the room history and the set of connected subscribers.
//! History and subscribers live behind a single mutex: registering a
//! subscriber and copying the history happen in one critical section, as do
//! appending a message and handing it to every subscriber queue. A joiner's
//! snapshot followed by the broadcasts it receives is therefore exactly the
//! history, and every subscriber sees broadcasts in append order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use super::message::ChatMessage;
use crate::config::RelayConfig;
use crate::{ChatError, Result};

pub use tokio::sync::mpsc::error::TryRecvError;

/// Identifier of a connected subscriber.
pub type SubscriberId = Uuid;

/// Shared handle to the chat relay.
///
/// Cloning the handle is cheap; all clones refer to the same room.
#[derive(Clone)]
pub struct Relay {
    inner: Arc<RelayInner>,
}

struct RelayInner {
    /// Capacity of each subscriber queue.
    buffer: usize,
    state: Mutex<RelayState>,
}

#[derive(Default)]
struct RelayState {
    history: Vec<ChatMessage>,
    subscribers: HashMap<SubscriberId, mpsc::Sender<ChatMessage>>,
}

impl RelayInner {
    fn lock(&self) -> MutexGuard<'_, RelayState> {
        // Critical sections never panic halfway through a mutation.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn remove(&self, id: &SubscriberId) -> bool {
        self.lock().subscribers.remove(id).is_some()
    }
}

impl Relay {
    /// Create a relay from configuration.
    pub fn new(config: &RelayConfig) -> Self {
        Self::with_buffer(config.subscriber_buffer)
    }

    /// Create a relay whose subscriber queues hold `buffer` messages.
    pub fn with_buffer(buffer: usize) -> Self {
        Self {
            inner: Arc::new(RelayInner {
                buffer: buffer.max(1),
                state: Mutex::new(RelayState::default()),
            }),
        }
    }

    /// Register a new subscriber.
    ///
    /// Returns a copy of the current history together with the subscription
    /// that will carry every message posted afterwards.
    pub fn connect(&self) -> (Vec<ChatMessage>, Subscription) {
        let id = Uuid::new_v4();
        let (sender, receiver) = mpsc::channel(self.inner.buffer);

        let snapshot = {
            let mut state = self.inner.lock();
            state.subscribers.insert(id, sender);
            state.history.clone()
        };

        tracing::debug!(subscriber = %id, history = snapshot.len(), "Subscriber connected");

        let subscription = Subscription {
            id,
            relay: Arc::downgrade(&self.inner),
            receiver,
        };
        (snapshot, subscription)
    }

    /// Append a message to the history and broadcast it.
    ///
    /// Every registered subscriber receives the message, including the one
    /// that posted it. Subscribers whose queue is closed or full are dropped.
    ///
    /// Returns the sequence index assigned to the message.
    pub fn post(&self, message: ChatMessage) -> Result<u64> {
        message.validate()?;

        let mut state = self.inner.lock();
        let seq = state.history.len() as u64;
        state.history.push(message.clone());

        state
            .subscribers
            .retain(|id, sender| match deliver(id, sender, &message) {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(error = %e, seq, "Dropping subscriber");
                    false
                }
            });

        tracing::debug!(
            seq,
            author = message.author(),
            receivers = state.subscribers.len(),
            "Message broadcast"
        );
        Ok(seq)
    }

    /// Remove a subscriber.
    ///
    /// Returns true if the subscriber was registered. History is untouched.
    pub fn disconnect(&self, id: &SubscriberId) -> bool {
        let removed = self.inner.remove(id);
        if removed {
            tracing::debug!(subscriber = %id, "Subscriber disconnected");
        }
        removed
    }

    /// Copy of the full history.
    pub fn history(&self) -> Vec<ChatMessage> {
        self.inner.lock().history.clone()
    }

    /// Number of messages in the history.
    pub fn history_len(&self) -> usize {
        self.inner.lock().history.len()
    }

    /// Number of connected subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }

    /// Check if a subscriber is still registered.
    pub fn is_subscribed(&self, id: &SubscriberId) -> bool {
        self.inner.lock().subscribers.contains_key(id)
    }
}

impl Default for Relay {
    fn default() -> Self {
        Self::new(&RelayConfig::default())
    }
}

fn deliver(
    id: &SubscriberId,
    sender: &mpsc::Sender<ChatMessage>,
    message: &ChatMessage,
) -> Result<()> {
    match sender.try_send(message.clone()) {
        Ok(()) => Ok(()),
        Err(TrySendError::Full(_)) | Err(TrySendError::Closed(_)) => {
            Err(ChatError::ChannelUnavailable(id.to_string()))
        }
    }
}

/// A registration with the relay.
///
/// Receives every message posted after [`Relay::connect`] returned it.
/// Dropping the subscription unregisters it.
pub struct Subscription {
    id: SubscriberId,
    relay: Weak<RelayInner>,
    receiver: mpsc::Receiver<ChatMessage>,
}

impl Subscription {
    /// Subscriber ID.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next broadcast.
    ///
    /// Returns `None` once the relay has dropped this subscriber and every
    /// queued message has been received.
    pub async fn recv(&mut self) -> Option<ChatMessage> {
        self.receiver.recv().await
    }

    /// Take the next queued broadcast without waiting.
    pub fn try_recv(&mut self) -> std::result::Result<ChatMessage, TryRecvError> {
        self.receiver.try_recv()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.relay.upgrade() {
            if inner.remove(&self.id) {
                tracing::debug!(subscriber = %self.id, "Subscription released");
            }
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(author: &str, text: &str) -> ChatMessage {
        ChatMessage::new(author, text)
    }

    #[test]
    fn test_connect_empty_relay() {
        let relay = Relay::default();
        let (snapshot, sub) = relay.connect();

        assert!(snapshot.is_empty());
        assert_eq!(relay.subscriber_count(), 1);
        assert!(relay.is_subscribed(&sub.id()));
    }

    #[test]
    fn test_post_assigns_sequence_index() {
        let relay = Relay::default();
        assert_eq!(relay.post(msg("alice", "one")).unwrap(), 0);
        assert_eq!(relay.post(msg("bob", "two")).unwrap(), 1);
        assert_eq!(relay.history_len(), 2);
    }

    #[test]
    fn test_post_invalid_message() {
        let relay = Relay::default();
        let (_, mut sub) = relay.connect();

        assert!(matches!(
            relay.post(msg("", "hi")),
            Err(ChatError::InvalidMessage(_))
        ));
        assert!(matches!(
            relay.post(msg("alice", "")),
            Err(ChatError::InvalidMessage(_))
        ));

        assert_eq!(relay.history_len(), 0);
        assert!(matches!(sub.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_post_echoes_to_sender_and_others() {
        let relay = Relay::default();
        let (_, mut sender) = relay.connect();
        let (_, mut other) = relay.connect();

        relay.post(msg("alice", "hi")).unwrap();

        assert_eq!(sender.recv().await.unwrap(), msg("alice", "hi"));
        assert_eq!(other.recv().await.unwrap(), msg("alice", "hi"));
    }

    #[tokio::test]
    async fn test_snapshot_then_broadcasts() {
        let relay = Relay::default();
        relay.post(msg("alice", "hi")).unwrap();

        let (snapshot, mut sub) = relay.connect();
        assert_eq!(snapshot, vec![msg("alice", "hi")]);

        relay.post(msg("alice", "there")).unwrap();
        assert_eq!(sub.recv().await.unwrap(), msg("alice", "there"));
        assert!(matches!(sub.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let relay = Relay::default();
        relay.post(msg("alice", "hi")).unwrap();

        let (snapshot, _sub) = relay.connect();
        relay.post(msg("bob", "later")).unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(relay.history_len(), 2);
    }

    #[test]
    fn test_disconnect() {
        let relay = Relay::default();
        let (_, mut sub) = relay.connect();
        relay.post(msg("alice", "hi")).unwrap();

        assert!(relay.disconnect(&sub.id()));
        assert!(!relay.disconnect(&sub.id()));
        assert_eq!(relay.subscriber_count(), 0);
        assert_eq!(relay.history_len(), 1);

        // Already queued message is still readable, then the channel closes.
        assert_eq!(sub.try_recv().unwrap(), msg("alice", "hi"));
        relay.post(msg("alice", "gone")).unwrap();
        assert!(matches!(sub.try_recv(), Err(TryRecvError::Disconnected)));
    }

    #[test]
    fn test_drop_subscription_unregisters() {
        let relay = Relay::default();
        let (_, sub) = relay.connect();
        let (_, _keep) = relay.connect();
        assert_eq!(relay.subscriber_count(), 2);

        drop(sub);
        assert_eq!(relay.subscriber_count(), 1);
    }

    #[test]
    fn test_subscription_outlives_relay() {
        let relay = Relay::default();
        let (_, sub) = relay.connect();
        drop(relay);
        drop(sub);
    }

    #[test]
    fn test_full_queue_drops_only_that_subscriber() {
        let relay = Relay::with_buffer(1);
        let (_, mut slow) = relay.connect();
        let (_, mut fast) = relay.connect();

        relay.post(msg("alice", "one")).unwrap();
        assert_eq!(fast.try_recv().unwrap(), msg("alice", "one"));

        relay.post(msg("alice", "two")).unwrap();
        assert_eq!(fast.try_recv().unwrap(), msg("alice", "two"));

        assert!(!relay.is_subscribed(&slow.id()));
        assert!(relay.is_subscribed(&fast.id()));
        assert_eq!(slow.try_recv().unwrap(), msg("alice", "one"));
        assert!(matches!(slow.try_recv(), Err(TryRecvError::Disconnected)));
        assert_eq!(relay.history_len(), 2);
    }

    #[test]
    fn test_closed_receiver_is_pruned_on_post() {
        let relay = Relay::default();
        let id = Uuid::new_v4();
        let (sender, receiver) = mpsc::channel(4);
        drop(receiver);
        relay.inner.lock().subscribers.insert(id, sender);
        assert!(relay.is_subscribed(&id));

        relay.post(msg("alice", "hi")).unwrap();
        assert!(!relay.is_subscribed(&id));
        assert_eq!(relay.history_len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_posts_same_order_for_all() {
        let relay = Relay::default();
        let (_, mut a) = relay.connect();
        let (_, mut b) = relay.connect();

        let mut handles = Vec::new();
        for i in 0..8 {
            let relay = relay.clone();
            handles.push(tokio::spawn(async move {
                for j in 0..25 {
                    relay.post(msg(&format!("user{i}"), &format!("{j}"))).unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let history = relay.history();
        assert_eq!(history.len(), 200);

        let mut seen_a = Vec::new();
        let mut seen_b = Vec::new();
        while let Ok(m) = a.try_recv() {
            seen_a.push(m);
        }
        while let Ok(m) = b.try_recv() {
            seen_b.push(m);
        }
        assert_eq!(seen_a, history);
        assert_eq!(seen_b, history);
    }
}
