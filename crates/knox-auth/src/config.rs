//! Authentication and token cache configuration.
//!
//! # Example
//!
//! ```toml
//! [auth]
//! token_ttl = "10h"
//! auto_refresh = false
//!
//! [auth.cache]
//! enabled = true
//! key_prefix = "knox"
//! alias = "default"
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Token issuance and refresh configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Lifetime of newly issued tokens. `None` issues tokens that never
    /// expire.
    #[serde(with = "humantime_serde")]
    pub token_ttl: Option<Duration>,

    /// Whether a successful store-path authentication renews the token's
    /// expiry by another `token_ttl`. Cache hits never renew.
    pub auto_refresh: bool,

    /// Token cache settings.
    pub cache: CacheConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl: Some(Duration::from_secs(10 * 60 * 60)), // 10 hours
            auto_refresh: false,
            cache: CacheConfig::default(),
        }
    }
}

/// Token cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Master switch for the cache layer. When `false`, every cache
    /// operation is a no-op and authentication runs purely against the
    /// token store.
    pub enabled: bool,

    /// Namespace prefix for every cache key, so several deployments can
    /// share one backing store without colliding.
    pub key_prefix: String,

    /// Name of the backing-store connection this cache is wired to.
    /// Resolution happens at composition time; the value is carried for
    /// diagnostics.
    pub alias: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            key_prefix: "knox".to_string(),
            alias: "default".to_string(),
        }
    }
}
