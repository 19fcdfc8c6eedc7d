//! In-process cache backend.

use std::collections::HashSet;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::cache::backend::{CacheBackend, CacheCommand};
use crate::error::CacheError;

/// Cache backend backed by in-process concurrent maps.
///
/// Useful for single-node deployments and tests. Entries live for the
/// lifetime of the process; there is no eviction.
#[derive(Debug, Default)]
pub struct MemoryCacheBackend {
    values: DashMap<String, Vec<u8>>,
    sets: DashMap<String, HashSet<String>>,
}

impl MemoryCacheBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of value entries currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no value entries are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[async_trait]
impl CacheBackend for MemoryCacheBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self.values.get(key).map(|entry| entry.value().clone()))
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, CacheError> {
        Ok(self
            .sets
            .get(key)
            .map(|entry| entry.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn execute(&self, commands: Vec<CacheCommand>) -> Result<(), CacheError> {
        for command in commands {
            match command {
                CacheCommand::Set { key, value } => {
                    self.values.insert(key, value);
                }
                // Deletion is type-agnostic, matching Redis DEL.
                CacheCommand::Delete { key } => {
                    self.values.remove(&key);
                    self.sets.remove(&key);
                }
                CacheCommand::SetAdd { key, member } => {
                    self.sets.entry(key).or_default().insert(member);
                }
                CacheCommand::SetRemove { key, member } => {
                    if let Some(mut entry) = self.sets.get_mut(&key) {
                        entry.remove(&member);
                    }
                }
            }
        }
        Ok(())
    }
}
