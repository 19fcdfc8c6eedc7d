//! # knox-auth-redis
//!
//! Redis cache backend for `knox-auth`, over a `deadpool-redis`
//! connection pool.
//!
//! Token entries map to plain string keys holding JSON, per-user indexes
//! to Redis sets, and batched mutations to a single pipeline, so one
//! authentication or invalidation costs one round trip. All errors are
//! reported to the caller; the token cache in `knox-auth` is the layer
//! that absorbs them.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use knox_auth::{CacheConfig, TokenCache};
//! use knox_auth_redis::RedisCacheBackend;
//!
//! let backend = RedisCacheBackend::from_url("redis://127.0.0.1:6379")?;
//! let cache = TokenCache::new(Arc::new(backend), CacheConfig::default());
//! ```

use async_trait::async_trait;
use deadpool_redis::Pool;
use redis::AsyncCommands;

use knox_auth::cache::{CacheBackend, CacheCommand};
use knox_auth::error::CacheError;

/// [`CacheBackend`] over a Redis connection pool.
pub struct RedisCacheBackend {
    pool: Pool,
}

impl RedisCacheBackend {
    /// Creates a backend over an existing pool.
    #[must_use]
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Creates a backend from a Redis URL with default pool settings.
    ///
    /// The pool connects lazily; an unreachable server surfaces as
    /// [`CacheError::Unavailable`] on first use, not here.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Unavailable`] if the URL does not parse.
    pub fn from_url(url: &str) -> Result<Self, CacheError> {
        let config = deadpool_redis::Config::from_url(url);
        let pool = config
            .create_pool(Some(deadpool_redis::Runtime::Tokio1))
            .map_err(|error| CacheError::unavailable(error.to_string()))?;
        tracing::debug!(url = %url, "created Redis cache pool");
        Ok(Self { pool })
    }

    async fn connection(&self) -> Result<deadpool_redis::Connection, CacheError> {
        self.pool
            .get()
            .await
            .map_err(|error| CacheError::unavailable(error.to_string()))
    }
}

#[async_trait]
impl CacheBackend for RedisCacheBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.connection().await?;
        conn.get::<_, Option<Vec<u8>>>(key)
            .await
            .map_err(|error| CacheError::command(error.to_string()))
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, CacheError> {
        let mut conn = self.connection().await?;
        conn.smembers::<_, Vec<String>>(key)
            .await
            .map_err(|error| CacheError::command(error.to_string()))
    }

    async fn execute(&self, commands: Vec<CacheCommand>) -> Result<(), CacheError> {
        if commands.is_empty() {
            return Ok(());
        }

        let mut conn = self.connection().await?;
        let mut pipe = redis::pipe();
        for command in &commands {
            match command {
                CacheCommand::Set { key, value } => {
                    pipe.set(key, value).ignore();
                }
                CacheCommand::Delete { key } => {
                    pipe.del(key).ignore();
                }
                CacheCommand::SetAdd { key, member } => {
                    pipe.sadd(key, member).ignore();
                }
                CacheCommand::SetRemove { key, member } => {
                    pipe.srem(key, member).ignore();
                }
            }
        }

        let _: () = pipe
            .query_async(&mut conn)
            .await
            .map_err(|error| CacheError::command(error.to_string()))?;
        Ok(())
    }
}

impl std::fmt::Debug for RedisCacheBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCacheBackend").finish_non_exhaustive()
    }
}
