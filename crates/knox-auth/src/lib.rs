//! # knox-auth
//!
//! Cache-aside bearer token authentication.
//!
//! Token records live in an authoritative token store the host provides.
//! In front of it sits a non-authoritative cache keyed by the public
//! token key, with a per-user index for bulk invalidation. Reads try the
//! cache first and re-validate everything an entry claims; writes go to
//! the store first and the cache second. A cache that is down, stale, or
//! lying degrades authentication to store lookups but never changes its
//! outcome.
//!
//! ## Features
//!
//! - Constant-time credential verification against SHA-256 digests
//! - Write-through caching on issuance and on store-path hits
//! - Self-healing invalidation: expired and orphaned entries are dropped
//!   the moment a lookup trips over them
//! - Broadcast of token deletions, with a hub that keeps the cache in
//!   step with deletions performed behind the cache's back
//! - Optional expiry auto-refresh on store-path authentication
//!
//! ## Modules
//!
//! - [`authenticator`]: credential authentication over cache and store
//! - [`cache`]: the token cache and its backend abstraction
//! - [`config`]: authentication and cache configuration
//! - [`error`]: error types
//! - [`events`]: token lifecycle events and the broadcast bus
//! - [`invalidation`]: event-driven cache invalidation hub
//! - [`session`]: issuing and revoking tokens
//! - [`storage`]: authoritative storage traits
//! - [`token`]: token records and credential primitives

pub mod authenticator;
pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod invalidation;
pub mod session;
pub mod storage;
pub mod token;

// Re-export main types for convenience
pub use authenticator::{Authenticated, TokenAuthenticator};
pub use cache::{CacheBackend, CacheCommand, MemoryCacheBackend, TokenCache};
pub use config::{AuthConfig, CacheConfig};
pub use error::{AuthError, CacheError, ErrorCategory};
pub use events::{EventBroadcaster, ExpirySource, TokenEvent};
pub use invalidation::InvalidationHub;
pub use session::{IssuedToken, SessionManager};
pub use storage::{EventedTokenStorage, TokenStorage, User, UserStorage};
pub use token::{
    AuthToken, CREDENTIAL_LENGTH, CachedToken, TOKEN_KEY_LENGTH, TokenView, digests_match,
    generate_credential, hash_credential, token_key,
};

/// Result type for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Commonly used types, importable in one line.
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::authenticator::{Authenticated, TokenAuthenticator};
    pub use crate::cache::{CacheBackend, MemoryCacheBackend, TokenCache};
    pub use crate::config::{AuthConfig, CacheConfig};
    pub use crate::error::{AuthError, CacheError};
    pub use crate::events::EventBroadcaster;
    pub use crate::invalidation::InvalidationHub;
    pub use crate::session::{IssuedToken, SessionManager};
    pub use crate::storage::{EventedTokenStorage, TokenStorage, User, UserStorage};
    pub use crate::token::AuthToken;
}
