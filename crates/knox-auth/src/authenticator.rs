//! Bearer credential authentication.
//!
//! Authentication tries the token cache first and falls back to the
//! token store. The cache is never trusted on its own: a hit still has
//! its digest compared in constant time, its expiry checked, and its
//! owner re-loaded from user storage. Any cache-side doubt falls
//! through to the store, so a broken or stale cache can slow
//! authentication down but never change its outcome.

use std::sync::Arc;

use time::OffsetDateTime;

use crate::AuthResult;
use crate::cache::TokenCache;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::events::{EventBroadcaster, ExpirySource};
use crate::storage::{TokenStorage, User, UserStorage};
use crate::token::{
    AuthToken, CREDENTIAL_REJECTED, CachedToken, TokenView, digests_match, hash_credential,
    token_key,
};

/// A successfully authenticated request.
#[derive(Debug, Clone)]
pub struct Authenticated {
    /// The authenticated user, freshly loaded from user storage.
    pub user: User,

    /// Non-secret view of the token that matched.
    pub token: TokenView,
}

/// Authenticates bearer credentials against the cache and token store.
pub struct TokenAuthenticator {
    cache: TokenCache,
    tokens: Arc<dyn TokenStorage>,
    users: Arc<dyn UserStorage>,
    events: Arc<EventBroadcaster>,
    config: AuthConfig,
}

impl TokenAuthenticator {
    /// Creates an authenticator.
    pub fn new(
        cache: TokenCache,
        tokens: Arc<dyn TokenStorage>,
        users: Arc<dyn UserStorage>,
        events: Arc<EventBroadcaster>,
        config: AuthConfig,
    ) -> Self {
        Self {
            cache,
            tokens,
            users,
            events,
            config,
        }
    }

    /// Authenticates a plaintext credential.
    ///
    /// Malformed credentials and credentials matching no token are
    /// rejected with one and the same error. Inactive users are reported
    /// as [`AuthError::InactiveUser`] instead, on both paths.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`] when the credential is
    /// rejected, [`AuthError::InactiveUser`] when it matched a token
    /// whose owner may not authenticate, and [`AuthError::Storage`] when
    /// the token or user store fails.
    pub async fn authenticate(&self, credential: &str) -> AuthResult<Authenticated> {
        let token_key = token_key(credential);
        let key_prefix = token_key.get(..8).unwrap_or(token_key);
        tracing::debug!(key_prefix = %key_prefix, "authenticating credential");

        if self.cache.is_enabled() {
            if let Some(cached) = self.cache.get(token_key).await {
                if let Some(authenticated) = self
                    .authenticate_from_cache(credential, token_key, &cached)
                    .await?
                {
                    tracing::debug!(
                        user_id = %authenticated.user.id,
                        "authenticated from cache"
                    );
                    return Ok(authenticated);
                }
                tracing::debug!(
                    key_prefix = %key_prefix,
                    "cache entry rejected, falling back to token store"
                );
            }
        } else {
            tracing::debug!("token cache disabled");
        }

        self.authenticate_from_store(credential, token_key).await
    }

    /// Validates a cache hit.
    ///
    /// Returns `Ok(None)` whenever the entry cannot vouch for the
    /// credential, routing the caller to the token store. Only an
    /// inactive or vanished-and-reappeared owner turns a validated hit
    /// into a hard error.
    async fn authenticate_from_cache(
        &self,
        credential: &str,
        token_key: &str,
        cached: &CachedToken,
    ) -> AuthResult<Option<Authenticated>> {
        let Ok(digest) = hash_credential(credential) else {
            return Ok(None);
        };

        if !digests_match(&digest, &cached.digest) {
            return Ok(None);
        }

        if cached.is_expired() {
            self.cache.delete(token_key, Some(cached.user_id)).await;
            return Ok(None);
        }

        // The active flag is never cached; load the user fresh.
        let Some(user) = self.users.find_by_id(cached.user_id).await? else {
            self.cache.delete(token_key, Some(cached.user_id)).await;
            return Ok(None);
        };

        if !user.is_active() {
            return Err(AuthError::inactive_user("user inactive or deleted"));
        }

        Ok(Some(Authenticated {
            token: TokenView::from(cached),
            user,
        }))
    }

    /// Authenticates against the token store.
    async fn authenticate_from_store(
        &self,
        credential: &str,
        token_key: &str,
    ) -> AuthResult<Authenticated> {
        let candidates = self.tokens.find_by_token_key(token_key).await?;

        for (candidate, user) in candidates {
            if self.cleanup_expired(&candidate, &user).await? {
                continue;
            }

            let digest = hash_credential(credential)?;
            if !digests_match(&digest, &candidate.digest) {
                continue;
            }

            let token = if self.config.auto_refresh && candidate.expires_at.is_some() {
                self.renew(candidate).await?
            } else {
                candidate
            };

            // Cache the token for future requests. This happens before
            // the active check; the cache path reloads the user anyway.
            let committed = self.cache.set(&token).await;
            tracing::debug!(user_id = %token.user_id, committed, "token written through to cache");

            if !user.is_active() {
                return Err(AuthError::inactive_user("user inactive or deleted"));
            }

            tracing::debug!(user_id = %user.id, "authenticated from token store");
            return Ok(Authenticated {
                token: TokenView::from(&token),
                user,
            });
        }

        Err(AuthError::invalid_token(CREDENTIAL_REJECTED))
    }

    /// Removes expired tokens belonging to the candidate's owner.
    ///
    /// All of the owner's other expired tokens are swept first, then the
    /// candidate itself. Returns `true` if the candidate was expired and
    /// removed.
    async fn cleanup_expired(&self, candidate: &AuthToken, user: &User) -> AuthResult<bool> {
        for sibling in self.tokens.list_for_user(candidate.user_id).await? {
            if sibling.digest == candidate.digest {
                continue;
            }
            if sibling.expires_at.is_none() || !sibling.is_expired() {
                continue;
            }

            self.cache
                .delete(&sibling.token_key, Some(sibling.user_id))
                .await;
            self.tokens.delete(&sibling.token_key).await?;
            self.events
                .send_expired(&user.username, ExpirySource::Sibling);
            tracing::debug!(token_key = %sibling.token_key, "removed expired sibling token");
        }

        if candidate.expires_at.is_some() && candidate.is_expired() {
            self.cache
                .delete(&candidate.token_key, Some(candidate.user_id))
                .await;
            self.tokens.delete(&candidate.token_key).await?;
            self.events
                .send_expired(&user.username, ExpirySource::Presented);
            tracing::debug!(token_key = %candidate.token_key, "removed expired token");
            return Ok(true);
        }

        Ok(false)
    }

    /// Pushes the token's expiry out by another TTL in the store. The
    /// caller's write-through carries the renewed expiry into the cache.
    async fn renew(&self, mut token: AuthToken) -> AuthResult<AuthToken> {
        let Some(ttl) = self.config.token_ttl else {
            return Ok(token);
        };

        let expires_at = OffsetDateTime::now_utc() + ttl;
        self.tokens
            .update_expiry(&token.token_key, Some(expires_at))
            .await?;
        token.expires_at = Some(expires_at);
        tracing::debug!(token_key = %token.token_key, "token expiry renewed");
        Ok(token)
    }
}

impl std::fmt::Debug for TokenAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenAuthenticator")
            .field("cache", &self.cache)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
