//! Cache backend trait.
//!
//! This module defines the narrow interface the token cache needs from a
//! backing store: point reads, set-membership reads, and batched
//! mutations. Backends are non-authoritative by contract; any of them may
//! lose data at any time.

use async_trait::async_trait;

use crate::error::CacheError;

/// A single mutation inside a batched cache round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheCommand {
    /// Stores a raw value under a key, replacing any previous value.
    Set {
        /// Fully namespaced key.
        key: String,
        /// Serialized value.
        value: Vec<u8>,
    },

    /// Removes a key of any type. Removing an absent key is not an error.
    Delete {
        /// Fully namespaced key.
        key: String,
    },

    /// Adds a member to the set stored under a key, creating the set if
    /// it does not exist yet.
    SetAdd {
        /// Fully namespaced key.
        key: String,
        /// Member to add.
        member: String,
    },

    /// Removes a member from the set stored under a key. Removing an
    /// absent member is not an error.
    SetRemove {
        /// Fully namespaced key.
        key: String,
        /// Member to remove.
        member: String,
    },
}

impl CacheCommand {
    /// Creates a `Set` command.
    #[must_use]
    pub fn set(key: impl Into<String>, value: Vec<u8>) -> Self {
        Self::Set {
            key: key.into(),
            value,
        }
    }

    /// Creates a `Delete` command.
    #[must_use]
    pub fn delete(key: impl Into<String>) -> Self {
        Self::Delete { key: key.into() }
    }

    /// Creates a `SetAdd` command.
    #[must_use]
    pub fn set_add(key: impl Into<String>, member: impl Into<String>) -> Self {
        Self::SetAdd {
            key: key.into(),
            member: member.into(),
        }
    }

    /// Creates a `SetRemove` command.
    #[must_use]
    pub fn set_remove(key: impl Into<String>, member: impl Into<String>) -> Self {
        Self::SetRemove {
            key: key.into(),
            member: member.into(),
        }
    }
}

/// Storage trait for cache backends.
///
/// Implementations hold opaque bytes under string keys plus string sets
/// used as per-user indexes. The interface is deliberately small:
/// everything the token cache does maps onto these three calls.
///
/// # Implementations
///
/// - [`MemoryCacheBackend`](crate::cache::MemoryCacheBackend) - in-process maps
/// - `knox-auth-redis` - Redis backend in a separate crate
///
/// # Example Implementation
///
/// ```ignore
/// use knox_auth::cache::{CacheBackend, CacheCommand};
/// use knox_auth::error::CacheError;
///
/// struct NullBackend;
///
/// #[async_trait::async_trait]
/// impl CacheBackend for NullBackend {
///     async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
///         Ok(None)
///     }
///     // ... other methods
/// }
/// ```
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Fetches the raw value stored under a key.
    ///
    /// # Arguments
    ///
    /// * `key` - Fully namespaced key
    ///
    /// # Returns
    ///
    /// Returns `Some(bytes)` if the key holds a value, `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be reached or the
    /// command fails.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Lists the members of the set stored under a key.
    ///
    /// # Arguments
    ///
    /// * `key` - Fully namespaced key
    ///
    /// # Returns
    ///
    /// Returns the members in unspecified order. An absent set is an
    /// empty list, not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be reached or the
    /// command fails.
    async fn set_members(&self, key: &str) -> Result<Vec<String>, CacheError>;

    /// Applies a batch of mutations in a single round trip.
    ///
    /// The batch is not transactional: backends may apply a prefix of it
    /// and then fail. Callers must tolerate partially applied batches,
    /// which the token cache does by validating entries on every read.
    ///
    /// # Arguments
    ///
    /// * `commands` - Mutations to apply, in order
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be reached or any
    /// command fails.
    async fn execute(&self, commands: Vec<CacheCommand>) -> Result<(), CacheError>;
}
