//! Event-emitting token storage wrapper.
//!
//! Wraps any [`TokenStorage`] and publishes a [`TokenEvent::Deleted`] for
//! every record a mutation removes, after the mutation succeeds. Reads
//! pass straight through. Paired with the invalidation hub this keeps
//! the cache in step with deletions performed by code that has never
//! heard of the cache.

use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::events::EventBroadcaster;
use crate::storage::token::TokenStorage;
use crate::storage::user::User;
use crate::token::AuthToken;

/// [`TokenStorage`] decorator that broadcasts deletions.
pub struct EventedTokenStorage<S: TokenStorage> {
    inner: S,
    broadcaster: Arc<EventBroadcaster>,
}

impl<S: TokenStorage> EventedTokenStorage<S> {
    /// Wraps a token store so its deletions are broadcast.
    pub fn new(inner: S, broadcaster: Arc<EventBroadcaster>) -> Self {
        Self { inner, broadcaster }
    }

    /// Returns a reference to the wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Returns the broadcaster used for events.
    pub fn broadcaster(&self) -> &Arc<EventBroadcaster> {
        &self.broadcaster
    }

    fn emit_deleted(&self, token: &AuthToken) {
        if self.broadcaster.subscriber_count() == 0 {
            return;
        }
        let received = self
            .broadcaster
            .send_deleted(&token.token_key, token.user_id);
        tracing::debug!(
            token_key = %token.token_key,
            user_id = %token.user_id,
            subscribers = received,
            "broadcast token deletion"
        );
    }
}

#[async_trait]
impl<S: TokenStorage> TokenStorage for EventedTokenStorage<S> {
    async fn create(&self, token: &AuthToken) -> AuthResult<()> {
        self.inner.create(token).await
    }

    async fn find_by_token_key(&self, token_key: &str) -> AuthResult<Vec<(AuthToken, User)>> {
        self.inner.find_by_token_key(token_key).await
    }

    async fn list_for_user(&self, user_id: Uuid) -> AuthResult<Vec<AuthToken>> {
        self.inner.list_for_user(user_id).await
    }

    async fn update_expiry(
        &self,
        token_key: &str,
        expires_at: Option<OffsetDateTime>,
    ) -> AuthResult<()> {
        self.inner.update_expiry(token_key, expires_at).await
    }

    async fn delete(&self, token_key: &str) -> AuthResult<Option<AuthToken>> {
        let deleted = self.inner.delete(token_key).await?;
        if let Some(token) = &deleted {
            self.emit_deleted(token);
        }
        Ok(deleted)
    }

    async fn delete_all_for_user(&self, user_id: Uuid) -> AuthResult<Vec<AuthToken>> {
        let deleted = self.inner.delete_all_for_user(user_id).await?;
        for token in &deleted {
            self.emit_deleted(token);
        }
        Ok(deleted)
    }
}

impl<S: TokenStorage> std::fmt::Debug for EventedTokenStorage<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventedTokenStorage")
            .field("subscribers", &self.broadcaster.subscriber_count())
            .finish_non_exhaustive()
    }
}
