//! Token lifecycle event types.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where an expired token was discovered during authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpirySource {
    /// The token the client presented.
    Presented,
    /// Another token of the same owner, swept while scanning.
    Sibling,
}

impl ExpirySource {
    /// Returns the string representation of the source.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Presented => "presented",
            Self::Sibling => "sibling",
        }
    }
}

impl fmt::Display for ExpirySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Token lifecycle event.
///
/// `Deleted` drives cache invalidation: it fires for every record removed
/// from the token store, whatever the reason, and carries enough to
/// address the cache entry. `Expired` is a notification that expiry
/// cleanup happened; the removal itself also fires `Deleted`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TokenEvent {
    /// A token record was removed from the token store.
    Deleted {
        /// Public lookup key of the removed record.
        token_key: String,
        /// Owner of the removed record.
        user_id: Uuid,
    },

    /// An expired token was cleaned up during authentication.
    Expired {
        /// Username of the token's owner.
        username: String,
        /// Whether the expired token was the one presented or a sibling.
        source: ExpirySource,
    },
}

impl TokenEvent {
    /// Creates a `Deleted` event.
    #[must_use]
    pub fn deleted(token_key: impl Into<String>, user_id: Uuid) -> Self {
        Self::Deleted {
            token_key: token_key.into(),
            user_id,
        }
    }

    /// Creates an `Expired` event.
    #[must_use]
    pub fn expired(username: impl Into<String>, source: ExpirySource) -> Self {
        Self::Expired {
            username: username.into(),
            source,
        }
    }

    /// Returns the event kind as a string, for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Deleted { .. } => "deleted",
            Self::Expired { .. } => "expired",
        }
    }
}
