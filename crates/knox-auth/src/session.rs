//! Session lifecycle: issuing and revoking tokens.
//!
//! The token store is always written first and the cache second, so a
//! cache failure can cost a round trip later but never an issued or
//! revoked session.

use std::sync::Arc;

use uuid::Uuid;

use crate::AuthResult;
use crate::cache::TokenCache;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::storage::{TokenStorage, User};
use crate::token::AuthToken;

/// A freshly issued session token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Full plaintext credential. This is the only time it exists
    /// outside the client; hand it over and drop it.
    pub plaintext: String,

    /// The persisted record.
    pub token: AuthToken,
}

/// Issues and revokes session tokens.
pub struct SessionManager {
    cache: TokenCache,
    tokens: Arc<dyn TokenStorage>,
    config: AuthConfig,
}

impl SessionManager {
    /// Creates a session manager.
    pub fn new(cache: TokenCache, tokens: Arc<dyn TokenStorage>, config: AuthConfig) -> Self {
        Self {
            cache,
            tokens,
            config,
        }
    }

    /// Issues a token for a user.
    ///
    /// The record is persisted first and written through to the cache
    /// after, so the very first authentication with it can already be a
    /// cache hit.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InactiveUser`] for users that may not
    /// authenticate, before anything is written, and [`AuthError::Storage`]
    /// if persisting the record fails.
    pub async fn login(&self, user: &User) -> AuthResult<IssuedToken> {
        if !user.is_active() {
            return Err(AuthError::inactive_user("user inactive or deleted"));
        }

        let (token, plaintext) = AuthToken::issue(user.id, self.config.token_ttl)?;
        self.tokens.create(&token).await?;

        let committed = self.cache.set(&token).await;
        tracing::info!(
            user_id = %user.id,
            token_key = %token.token_key,
            cached = committed,
            "issued token"
        );

        Ok(IssuedToken { plaintext, token })
    }

    /// Revokes a single token.
    ///
    /// Idempotent: revoking a token key with no record behind it still
    /// clears the cache and succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Storage`] if the store delete fails. The
    /// cache is only touched after the store succeeded.
    pub async fn logout(&self, token_key: &str, user_id: Uuid) -> AuthResult<()> {
        self.tokens.delete(token_key).await?;
        self.cache.delete(token_key, Some(user_id)).await;
        tracing::info!(user_id = %user_id, token_key = %token_key, "revoked token");
        Ok(())
    }

    /// Revokes every token a user holds.
    ///
    /// # Returns
    ///
    /// Returns the number of revoked tokens.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Storage`] if the store delete fails. The
    /// cache is only touched after the store succeeded.
    pub async fn logout_all(&self, user_id: Uuid) -> AuthResult<u64> {
        let deleted = self.tokens.delete_all_for_user(user_id).await?;
        self.cache.delete_all_for_user(user_id).await;
        tracing::info!(user_id = %user_id, count = deleted.len(), "revoked all tokens for user");
        Ok(deleted.len() as u64)
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("cache", &self.cache)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCacheBackend;
    use crate::config::CacheConfig;
    use crate::token::{hash_credential, token_key};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use time::OffsetDateTime;

    #[derive(Default)]
    struct MockStore {
        tokens: Mutex<Vec<AuthToken>>,
    }

    #[async_trait]
    impl TokenStorage for MockStore {
        async fn create(&self, token: &AuthToken) -> AuthResult<()> {
            self.tokens.lock().unwrap().push(token.clone());
            Ok(())
        }

        async fn find_by_token_key(
            &self,
            _token_key: &str,
        ) -> AuthResult<Vec<(AuthToken, User)>> {
            unimplemented!("not exercised by these tests")
        }

        async fn list_for_user(&self, _user_id: Uuid) -> AuthResult<Vec<AuthToken>> {
            unimplemented!("not exercised by these tests")
        }

        async fn update_expiry(
            &self,
            _token_key: &str,
            _expires_at: Option<OffsetDateTime>,
        ) -> AuthResult<()> {
            unimplemented!("not exercised by these tests")
        }

        async fn delete(&self, token_key: &str) -> AuthResult<Option<AuthToken>> {
            let mut tokens = self.tokens.lock().unwrap();
            let position = tokens.iter().position(|token| token.token_key == token_key);
            Ok(position.map(|index| tokens.remove(index)))
        }

        async fn delete_all_for_user(&self, user_id: Uuid) -> AuthResult<Vec<AuthToken>> {
            let mut tokens = self.tokens.lock().unwrap();
            let (deleted, kept): (Vec<_>, Vec<_>) =
                tokens.drain(..).partition(|token| token.user_id == user_id);
            *tokens = kept;
            Ok(deleted)
        }
    }

    fn manager() -> (SessionManager, Arc<MockStore>, TokenCache) {
        let store = Arc::new(MockStore::default());
        let cache = TokenCache::new(
            Arc::new(MemoryCacheBackend::new()),
            CacheConfig::default(),
        );
        let manager = SessionManager::new(cache.clone(), store.clone(), AuthConfig::default());
        (manager, store, cache)
    }

    #[tokio::test]
    async fn test_login_persists_and_caches() {
        let (manager, store, cache) = manager();
        let user = User::new("alice");

        let issued = manager.login(&user).await.unwrap();

        assert_eq!(issued.token.user_id, user.id);
        assert_eq!(issued.token.token_key, token_key(&issued.plaintext));
        assert_eq!(
            issued.token.digest,
            hash_credential(&issued.plaintext).unwrap()
        );
        // Default TTL applies.
        assert!(issued.token.expires_at.is_some());

        assert_eq!(store.tokens.lock().unwrap().len(), 1);
        let cached = cache.get(&issued.token.token_key).await.expect("cached");
        assert_eq!(cached.digest, issued.token.digest);
    }

    #[tokio::test]
    async fn test_login_inactive_user_writes_nothing() {
        let (manager, store, _) = manager();
        let user = User {
            active: false,
            ..User::new("bob")
        };

        let err = manager.login(&user).await.unwrap_err();
        assert!(err.is_inactive_user());
        assert!(store.tokens.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_login_without_ttl_issues_non_expiring_token() {
        let store = Arc::new(MockStore::default());
        let cache = TokenCache::new(
            Arc::new(MemoryCacheBackend::new()),
            CacheConfig::default(),
        );
        let config = AuthConfig {
            token_ttl: None,
            ..AuthConfig::default()
        };
        let manager = SessionManager::new(cache, store, config);

        let issued = manager.login(&User::new("carol")).await.unwrap();
        assert_eq!(issued.token.expires_at, None);
    }

    #[tokio::test]
    async fn test_logout_removes_store_record_and_cache_entry() {
        let (manager, store, cache) = manager();
        let user = User::new("alice");
        let issued = manager.login(&user).await.unwrap();

        manager.logout(&issued.token.token_key, user.id).await.unwrap();

        assert!(store.tokens.lock().unwrap().is_empty());
        assert!(cache.get(&issued.token.token_key).await.is_none());
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let (manager, _, _) = manager();
        manager.logout("nosuchkey", Uuid::new_v4()).await.unwrap();
    }

    #[tokio::test]
    async fn test_logout_all_counts_and_sweeps() {
        let (manager, store, cache) = manager();
        let user = User::new("alice");
        let other = User::new("bob");
        let first = manager.login(&user).await.unwrap();
        let second = manager.login(&user).await.unwrap();
        let kept = manager.login(&other).await.unwrap();

        let revoked = manager.logout_all(user.id).await.unwrap();
        assert_eq!(revoked, 2);

        assert!(cache.get(&first.token.token_key).await.is_none());
        assert!(cache.get(&second.token.token_key).await.is_none());
        assert!(cache.get(&kept.token.token_key).await.is_some());
        assert_eq!(store.tokens.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_logout_all_with_no_tokens() {
        let (manager, _, _) = manager();
        let revoked = manager.logout_all(Uuid::new_v4()).await.unwrap();
        assert_eq!(revoked, 0);
    }

    #[tokio::test]
    async fn test_issue_with_disabled_cache_persists_only() {
        let store = Arc::new(MockStore::default());
        let backend = Arc::new(MemoryCacheBackend::new());
        let cache = TokenCache::new(
            backend.clone(),
            CacheConfig {
                enabled: false,
                ..CacheConfig::default()
            },
        );
        let manager = SessionManager::new(cache, store.clone(), AuthConfig::default());

        manager.login(&User::new("alice")).await.unwrap();

        assert_eq!(store.tokens.lock().unwrap().len(), 1);
        assert!(backend.is_empty());
    }
}
