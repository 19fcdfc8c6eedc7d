//! Token cache layer.
//!
//! The cache is strictly non-authoritative: it accelerates lookups and
//! must never make authentication wrong. Reads that fail degrade to
//! misses, writes that fail report as not committed, and the
//! authenticator re-validates everything a cache entry claims.
//!
//! # Module Structure
//!
//! - [`backend`]: the [`CacheBackend`] trait and batched [`CacheCommand`]s
//! - [`memory`]: in-process backend over concurrent maps
//! - [`token_cache`]: the cache-aside layer itself

pub mod backend;
pub mod memory;
pub mod token_cache;

pub use backend::{CacheBackend, CacheCommand};
pub use memory::MemoryCacheBackend;
pub use token_cache::TokenCache;
