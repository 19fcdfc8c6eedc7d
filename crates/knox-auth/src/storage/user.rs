//! User accounts as seen by the authentication layer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AuthResult;

/// A user account.
///
/// Only the fields authentication needs: identity, a display name for
/// notifications, and the active flag. The active flag is authoritative
/// here and never trusted from the cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier.
    pub id: Uuid,

    /// Username, carried into token expiry notifications.
    pub username: String,

    /// Whether the account may authenticate. Inactive accounts keep
    /// their tokens, but every authentication attempt fails.
    pub active: bool,
}

impl User {
    /// Creates an active user with a fresh id.
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            active: true,
        }
    }

    /// Returns `true` if the account may authenticate.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }
}

/// Storage trait for user accounts.
///
/// The authenticator looks users up by id on every cache hit, so
/// implementations should make this lookup cheap.
#[async_trait]
pub trait UserStorage: Send + Sync {
    /// Finds a user by id.
    ///
    /// # Arguments
    ///
    /// * `user_id` - The user's UUID
    ///
    /// # Returns
    ///
    /// Returns `Some(user)` if found, `None` if the account no longer
    /// exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_id(&self, user_id: Uuid) -> AuthResult<Option<User>>;
}
