//! In-process key-value store with TTL expiry
//!
//! Used when no Redis is available (`cache.backend: memory`) and in tests.
//! Contents are lost when the process exits. Expired entries are dropped on
//! read and by a periodic sweep (see [`spawn_cleanup_task`]).

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::debug;

use super::{KeyValueStore, StoreHealth};
use crate::Result;

/// Thread-safe string store with optional per-key expiry
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, Entry>,
}

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.evict_expired();
        self.entries.len()
    }

    /// Whether the store holds no live entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry, like `FLUSHDB`
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Remove expired entries, returning how many were dropped
    pub fn evict_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        before.saturating_sub(self.entries.len())
    }

    /// Remove `key` only if the entry stored now is expired.
    ///
    /// A value written after the caller saw the expired one is kept.
    fn remove_if_expired(&self, key: &str) {
        self.entries.remove_if(key, |_, entry| entry.is_expired());
    }

    fn insert(&self, key: &str, value: &str, expires_at: Option<Instant>) {
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.insert(key, value, Some(Instant::now() + ttl));
        Ok(())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.insert(key, value, None);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let Some(entry) = self.entries.get(key) else {
            return Ok(None);
        };
        if entry.is_expired() {
            drop(entry);
            self.remove_if_expired(key);
            return Ok(None);
        }
        Ok(Some(entry.value.clone()))
    }

    async fn health(&self) -> StoreHealth {
        StoreHealth::Connected
    }
}

/// Spawn a background task that evicts expired entries from `store`.
///
/// The task runs every `interval` and stops once it holds the last reference
/// to the store.
pub fn spawn_cleanup_task(store: Arc<MemoryStore>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if Arc::strong_count(&store) <= 1 {
                break;
            }
            let evicted = store.evict_expired();
            if evicted > 0 {
                debug!(
                    evicted,
                    remaining = store.entries.len(),
                    "Evicted expired cache entries"
                );
            }
        }
    })
}
