//! Token store trait.
//!
//! The token store is the authoritative home of token records. The cache
//! in front of it may lose or lag behind anything; whatever this store
//! says is the truth.

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::storage::user::User;
use crate::token::AuthToken;

/// Storage trait for token records.
///
/// Token keys are lookup handles, not unique identifiers: distinct
/// credentials can share the same leading characters, so key lookups
/// return every match and the caller disambiguates by digest.
///
/// # Implementations
///
/// Hosts bring their own implementation (SQL, KV, in-memory). Wrapping
/// it in [`EventedTokenStorage`](crate::storage::EventedTokenStorage)
/// publishes deletions to the invalidation hub.
///
/// # Example Implementation
///
/// ```ignore
/// use knox_auth::storage::TokenStorage;
/// use knox_auth::token::AuthToken;
/// use knox_auth::AuthResult;
///
/// struct InMemoryTokenStorage {
///     records: std::sync::RwLock<Vec<AuthToken>>,
/// }
///
/// #[async_trait::async_trait]
/// impl TokenStorage for InMemoryTokenStorage {
///     async fn create(&self, token: &AuthToken) -> AuthResult<()> {
///         self.records.write().unwrap().push(token.clone());
///         Ok(())
///     }
///     // ... other methods
/// }
/// ```
#[async_trait]
pub trait TokenStorage: Send + Sync {
    /// Persists a new token record.
    ///
    /// # Arguments
    ///
    /// * `token` - The record to store (digest, never the credential)
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be stored.
    async fn create(&self, token: &AuthToken) -> AuthResult<()>;

    /// Finds every record matching a token key, with its owner.
    ///
    /// # Arguments
    ///
    /// * `token_key` - Public lookup key extracted from a credential
    ///
    /// # Returns
    ///
    /// Returns all matching records regardless of expiry, each paired
    /// with its owning user. Callers check expiry and digest themselves.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_token_key(&self, token_key: &str) -> AuthResult<Vec<(AuthToken, User)>>;

    /// Lists every record owned by a user.
    ///
    /// # Arguments
    ///
    /// * `user_id` - The owner's UUID
    ///
    /// # Returns
    ///
    /// Returns the user's records regardless of expiry.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn list_for_user(&self, user_id: Uuid) -> AuthResult<Vec<AuthToken>>;

    /// Overwrites the expiry of the record with the given token key.
    ///
    /// # Arguments
    ///
    /// * `token_key` - Key of the record to update
    /// * `expires_at` - New expiry, `None` making the token non-expiring
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails. Updating an
    /// absent record is not an error.
    async fn update_expiry(
        &self,
        token_key: &str,
        expires_at: Option<OffsetDateTime>,
    ) -> AuthResult<()>;

    /// Deletes the record with the given token key.
    ///
    /// # Arguments
    ///
    /// * `token_key` - Key of the record to delete
    ///
    /// # Returns
    ///
    /// Returns the deleted record, or `None` if no record matched.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn delete(&self, token_key: &str) -> AuthResult<Option<AuthToken>>;

    /// Deletes every record owned by a user.
    ///
    /// # Arguments
    ///
    /// * `user_id` - The owner's UUID
    ///
    /// # Returns
    ///
    /// Returns the deleted records.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn delete_all_for_user(&self, user_id: Uuid) -> AuthResult<Vec<AuthToken>>;
}
