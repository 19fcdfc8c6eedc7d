//! Event-driven cache invalidation.
//!
//! Subscribes to [`TokenEvent`]s and removes cache entries for every
//! deleted token, whether the deletion came from a logout, an expiry
//! sweep, or administrative code that only talked to the token store.
//! Deleting an entry the session flows already removed is a harmless
//! repeat.

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::cache::TokenCache;
use crate::events::{EventBroadcaster, TokenEvent};

/// Keeps the token cache in step with token store deletions.
///
/// The subscription is taken at construction time, so events sent
/// between building the hub and running it are not lost.
pub struct InvalidationHub {
    cache: TokenCache,
    receiver: broadcast::Receiver<TokenEvent>,
}

impl InvalidationHub {
    /// Creates a hub subscribed to a broadcaster.
    #[must_use]
    pub fn new(cache: TokenCache, events: &EventBroadcaster) -> Self {
        Self {
            cache,
            receiver: events.subscribe(),
        }
    }

    /// Processes events until the broadcast channel closes.
    pub async fn run(mut self) {
        loop {
            match self.receiver.recv().await {
                Ok(TokenEvent::Deleted { token_key, user_id }) => {
                    let committed = self.cache.delete(&token_key, Some(user_id)).await;
                    tracing::debug!(
                        token_key = %token_key,
                        user_id = %user_id,
                        committed,
                        "invalidated cache entry for deleted token"
                    );
                }
                Ok(TokenEvent::Expired { username, source }) => {
                    // Expiry cleanup already removed the entry; this
                    // event is informational.
                    tracing::debug!(
                        username = %username,
                        source = %source,
                        "token expired during authentication"
                    );
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(
                        missed,
                        "invalidation hub lagged behind token events, some cache entries may be stale"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::debug!("token event channel closed, stopping invalidation hub");
                    break;
                }
            }
        }
    }

    /// Spawns the hub onto the current runtime.
    ///
    /// The returned handle can be used to await or abort it.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

impl std::fmt::Debug for InvalidationHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvalidationHub")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
