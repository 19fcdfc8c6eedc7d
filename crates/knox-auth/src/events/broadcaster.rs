//! Token event broadcasting.
//!
//! A thin wrapper around a [`tokio::sync::broadcast`] channel. Sending
//! never blocks and never fails: with no subscribers the event is
//! dropped, and slow subscribers lag rather than exerting backpressure.

use std::sync::Arc;

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::events::types::{ExpirySource, TokenEvent};

/// Default buffer size for the broadcast channel.
const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Broadcast bus for [`TokenEvent`]s.
#[derive(Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<TokenEvent>,
}

impl EventBroadcaster {
    /// Creates a broadcaster with the default buffer size.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE)
    }

    /// Creates a broadcaster with the given buffer capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Creates a broadcaster wrapped in an [`Arc`] for sharing.
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Sends an event.
    ///
    /// Returns the number of subscribers that received it; zero when
    /// nobody is listening.
    pub fn send(&self, event: TokenEvent) -> usize {
        self.sender.send(event).unwrap_or_default()
    }

    /// Sends a `Deleted` event.
    pub fn send_deleted(&self, token_key: impl Into<String>, user_id: Uuid) -> usize {
        self.send(TokenEvent::deleted(token_key, user_id))
    }

    /// Sends an `Expired` event.
    pub fn send_expired(&self, username: impl Into<String>, source: ExpirySource) -> usize {
        self.send(TokenEvent::expired(username, source))
    }

    /// Subscribes to token events.
    ///
    /// The receiver observes events sent after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TokenEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Returns `true` if anyone is subscribed.
    #[must_use]
    pub fn has_subscribers(&self) -> bool {
        self.subscriber_count() > 0
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBroadcaster")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
