//! Non-authoritative token cache.
//!
//! Sits in front of the token store and holds JSON projections of token
//! records, keyed by token key, plus a per-user set of token keys used
//! for bulk invalidation. Every operation absorbs backend failures: a
//! broken cache degrades reads to misses and reports writes as not
//! committed, and authentication stays correct because callers always
//! fall back to the store.

use std::fmt;
use std::sync::Arc;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::cache::backend::{CacheBackend, CacheCommand};
use crate::config::CacheConfig;
use crate::token::{AuthToken, CachedToken};

/// Cache-aside layer over a [`CacheBackend`].
///
/// Cheap to clone; clones share the backend.
#[derive(Clone)]
pub struct TokenCache {
    backend: Arc<dyn CacheBackend>,
    config: CacheConfig,
}

impl TokenCache {
    /// Creates a token cache over a backend.
    pub fn new(backend: Arc<dyn CacheBackend>, config: CacheConfig) -> Self {
        tracing::debug!(
            alias = %config.alias,
            key_prefix = %config.key_prefix,
            enabled = config.enabled,
            "token cache initialized"
        );
        Self { backend, config }
    }

    /// Returns `true` if the cache layer is switched on.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Key of the cache entry for a token.
    fn entry_key(&self, token_key: &str) -> String {
        format!("{}:token:{}", self.config.key_prefix, token_key)
    }

    /// Key of the per-user index set.
    fn index_key(&self, user_id: Uuid) -> String {
        format!("{}:user:{}:tokens", self.config.key_prefix, user_id)
    }

    /// Looks up the cached entry for a token key.
    ///
    /// Returns `None` on a miss, when the cache is disabled, when the
    /// backend fails, or when the stored entry does not decode. An entry
    /// coming back `Some` has not been validated: callers must still
    /// check the digest and expiry themselves.
    pub async fn get(&self, token_key: &str) -> Option<CachedToken> {
        if !self.config.enabled {
            return None;
        }

        let key = self.entry_key(token_key);
        let data = match self.backend.get(&key).await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::debug!(key = %key, "token cache miss");
                return None;
            }
            Err(error) => {
                tracing::warn!(key = %key, error = %error, "token cache read failed");
                return None;
            }
        };

        match serde_json::from_slice(&data) {
            Ok(cached) => {
                tracing::debug!(key = %key, "token cache hit");
                Some(cached)
            }
            Err(error) => {
                tracing::warn!(key = %key, error = %error, "discarding undecodable cache entry");
                None
            }
        }
    }

    /// Writes a token record through to the cache and registers it in
    /// the owner's index, in one round trip.
    ///
    /// Returns `true` if the write was committed. Safe to repeat: both
    /// halves are idempotent.
    pub async fn set(&self, token: &AuthToken) -> bool {
        if !self.config.enabled {
            return false;
        }

        let entry = CachedToken::from(token);
        let payload = match serde_json::to_vec(&entry) {
            Ok(payload) => payload,
            Err(error) => {
                tracing::warn!(error = %error, "failed to serialize token cache entry");
                return false;
            }
        };

        let key = self.entry_key(&token.token_key);
        let commands = vec![
            CacheCommand::set(&key, payload),
            CacheCommand::set_add(self.index_key(token.user_id), &token.token_key),
        ];

        match self.backend.execute(commands).await {
            Ok(()) => {
                tracing::debug!(key = %key, user_id = %token.user_id, "token cached");
                true
            }
            Err(error) => {
                tracing::warn!(key = %key, error = %error, "token cache write failed");
                false
            }
        }
    }

    /// Removes the cached entry for a token key.
    ///
    /// When the owner is known, the token key is also removed from the
    /// owner's index; otherwise the index member is left behind and
    /// swept with the rest of the index on bulk invalidation.
    pub async fn delete(&self, token_key: &str, owner: Option<Uuid>) -> bool {
        if !self.config.enabled {
            return false;
        }

        let key = self.entry_key(token_key);
        let mut commands = vec![CacheCommand::delete(&key)];
        if let Some(user_id) = owner {
            commands.push(CacheCommand::set_remove(self.index_key(user_id), token_key));
        }

        match self.backend.execute(commands).await {
            Ok(()) => {
                tracing::debug!(key = %key, "token cache entry deleted");
                true
            }
            Err(error) => {
                tracing::warn!(key = %key, error = %error, "token cache delete failed");
                false
            }
        }
    }

    /// Removes every cached entry registered to a user, then the index
    /// itself.
    ///
    /// An empty or missing index counts as success.
    pub async fn delete_all_for_user(&self, user_id: Uuid) -> bool {
        if !self.config.enabled {
            return false;
        }

        let index = self.index_key(user_id);
        let members = match self.backend.set_members(&index).await {
            Ok(members) => members,
            Err(error) => {
                tracing::warn!(key = %index, error = %error, "token index read failed");
                return false;
            }
        };

        if members.is_empty() {
            return true;
        }

        let mut commands: Vec<CacheCommand> = members
            .iter()
            .map(|token_key| CacheCommand::delete(self.entry_key(token_key)))
            .collect();
        commands.push(CacheCommand::delete(&index));

        match self.backend.execute(commands).await {
            Ok(()) => {
                tracing::debug!(
                    key = %index,
                    count = members.len(),
                    "user token cache entries deleted"
                );
                true
            }
            Err(error) => {
                tracing::warn!(key = %index, error = %error, "user token cache sweep failed");
                false
            }
        }
    }

    /// Rewrites the expiry of an existing cached entry.
    ///
    /// Never creates an entry: if the token is not cached, the new
    /// expiry reaches the cache on the next write-through.
    pub async fn update_expiry(
        &self,
        token_key: &str,
        expires_at: Option<OffsetDateTime>,
    ) -> bool {
        if !self.config.enabled {
            return false;
        }

        let key = self.entry_key(token_key);
        let data = match self.backend.get(&key).await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::debug!(key = %key, "expiry update skipped, token not cached");
                return false;
            }
            Err(error) => {
                tracing::warn!(key = %key, error = %error, "token cache read failed");
                return false;
            }
        };

        let mut cached: CachedToken = match serde_json::from_slice(&data) {
            Ok(cached) => cached,
            Err(error) => {
                tracing::warn!(key = %key, error = %error, "discarding undecodable cache entry");
                return false;
            }
        };
        cached.expires_at = expires_at;

        let payload = match serde_json::to_vec(&cached) {
            Ok(payload) => payload,
            Err(error) => {
                tracing::warn!(error = %error, "failed to serialize token cache entry");
                return false;
            }
        };

        match self
            .backend
            .execute(vec![CacheCommand::set(&key, payload)])
            .await
        {
            Ok(()) => {
                tracing::debug!(key = %key, "token cache expiry updated");
                true
            }
            Err(error) => {
                tracing::warn!(key = %key, error = %error, "token cache expiry update failed");
                false
            }
        }
    }
}

impl fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCache")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory::MemoryCacheBackend;
    use crate::error::CacheError;
    use async_trait::async_trait;
    use std::time::Duration;

    /// Backend whose every call fails, standing in for an unreachable
    /// backing store.
    struct FailingBackend;

    #[async_trait]
    impl CacheBackend for FailingBackend {
        async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
            Err(CacheError::unavailable("connection refused"))
        }

        async fn set_members(&self, _key: &str) -> Result<Vec<String>, CacheError> {
            Err(CacheError::unavailable("connection refused"))
        }

        async fn execute(&self, _commands: Vec<CacheCommand>) -> Result<(), CacheError> {
            Err(CacheError::unavailable("connection refused"))
        }
    }

    fn cache_with_memory() -> (TokenCache, Arc<MemoryCacheBackend>) {
        let backend = Arc::new(MemoryCacheBackend::new());
        let cache = TokenCache::new(backend.clone(), CacheConfig::default());
        (cache, backend)
    }

    fn sample_token() -> AuthToken {
        let (token, _) = AuthToken::issue(Uuid::new_v4(), Some(Duration::from_secs(3600)))
            .expect("issue token");
        token
    }

    #[tokio::test]
    async fn test_set_then_get_roundtrip() {
        let (cache, _) = cache_with_memory();
        let token = sample_token();

        assert!(cache.set(&token).await);

        let cached = cache.get(&token.token_key).await.expect("cached entry");
        assert_eq!(cached.digest, token.digest);
        assert_eq!(cached.user_id, token.user_id);
        assert_eq!(cached.expires_at, token.expires_at);
    }

    #[tokio::test]
    async fn test_get_miss_returns_none() {
        let (cache, _) = cache_with_memory();
        assert!(cache.get("nosuchkey").await.is_none());
    }

    #[tokio::test]
    async fn test_set_is_idempotent() {
        let (cache, backend) = cache_with_memory();
        let token = sample_token();

        assert!(cache.set(&token).await);
        assert!(cache.set(&token).await);

        assert!(cache.get(&token.token_key).await.is_some());
        let index = format!("knox:user:{}:tokens", token.user_id);
        assert_eq!(backend.set_members(&index).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_with_owner_cleans_index() {
        let (cache, backend) = cache_with_memory();
        let token = sample_token();
        cache.set(&token).await;

        assert!(cache.delete(&token.token_key, Some(token.user_id)).await);

        assert!(cache.get(&token.token_key).await.is_none());
        let index = format!("knox:user:{}:tokens", token.user_id);
        assert!(backend.set_members(&index).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_without_owner_leaves_index_member() {
        let (cache, backend) = cache_with_memory();
        let token = sample_token();
        cache.set(&token).await;

        assert!(cache.delete(&token.token_key, None).await);

        assert!(cache.get(&token.token_key).await.is_none());
        // The dangling index member is tolerated and swept later.
        let index = format!("knox:user:{}:tokens", token.user_id);
        assert_eq!(backend.set_members(&index).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_all_for_user() {
        let (cache, backend) = cache_with_memory();
        let user_id = Uuid::new_v4();
        let (first, _) = AuthToken::issue(user_id, None).unwrap();
        let (second, _) = AuthToken::issue(user_id, None).unwrap();
        cache.set(&first).await;
        cache.set(&second).await;

        assert!(cache.delete_all_for_user(user_id).await);

        assert!(cache.get(&first.token_key).await.is_none());
        assert!(cache.get(&second.token_key).await.is_none());
        let index = format!("knox:user:{user_id}:tokens");
        assert!(backend.set_members(&index).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_all_for_user_empty_index_is_success() {
        let (cache, _) = cache_with_memory();
        assert!(cache.delete_all_for_user(Uuid::new_v4()).await);
    }

    #[tokio::test]
    async fn test_update_expiry_rewrites_entry() {
        let (cache, _) = cache_with_memory();
        let token = sample_token();
        cache.set(&token).await;

        let new_expiry = OffsetDateTime::now_utc() + Duration::from_secs(7200);
        assert!(cache.update_expiry(&token.token_key, Some(new_expiry)).await);

        let cached = cache.get(&token.token_key).await.expect("cached entry");
        assert_eq!(cached.expires_at, Some(new_expiry));
        // Everything but the expiry is untouched.
        assert_eq!(cached.digest, token.digest);
        assert_eq!(cached.user_id, token.user_id);
    }

    #[tokio::test]
    async fn test_update_expiry_never_creates_entries() {
        let (cache, backend) = cache_with_memory();

        assert!(!cache.update_expiry("absent", None).await);
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_cache_is_inert() {
        let backend = Arc::new(MemoryCacheBackend::new());
        let config = CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        };
        let cache = TokenCache::new(backend.clone(), config);
        let token = sample_token();

        assert!(!cache.set(&token).await);
        assert!(cache.get(&token.token_key).await.is_none());
        assert!(!cache.delete(&token.token_key, Some(token.user_id)).await);
        assert!(!cache.delete_all_for_user(token.user_id).await);
        assert!(!cache.update_expiry(&token.token_key, None).await);
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn test_backend_failures_degrade_to_misses() {
        let cache = TokenCache::new(Arc::new(FailingBackend), CacheConfig::default());
        let token = sample_token();

        assert!(cache.get(&token.token_key).await.is_none());
        assert!(!cache.set(&token).await);
        assert!(!cache.delete(&token.token_key, Some(token.user_id)).await);
        assert!(!cache.delete_all_for_user(token.user_id).await);
        assert!(!cache.update_expiry(&token.token_key, None).await);
    }

    #[tokio::test]
    async fn test_undecodable_entry_reads_as_miss() {
        let (cache, backend) = cache_with_memory();
        backend
            .execute(vec![CacheCommand::set("knox:token:garbled", b"not json".to_vec())])
            .await
            .unwrap();

        assert!(cache.get("garbled").await.is_none());
    }

    #[tokio::test]
    async fn test_key_prefix_namespaces_entries() {
        let backend = Arc::new(MemoryCacheBackend::new());
        let knox = TokenCache::new(backend.clone(), CacheConfig::default());
        let other = TokenCache::new(
            backend,
            CacheConfig {
                key_prefix: "other".to_string(),
                ..CacheConfig::default()
            },
        );
        let token = sample_token();

        knox.set(&token).await;

        assert!(knox.get(&token.token_key).await.is_some());
        assert!(other.get(&token.token_key).await.is_none());
    }
}
