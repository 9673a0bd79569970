//! Snapshot cache backed by a key-value store with per-key expiry
//!
//! Every recorded snapshot lands twice in the store:
//!
//! - `<prefix>:<unix millis>` with a TTL (one hour by default)
//! - `<prefix>:latest` with no expiry, overwritten on every write
//!
//! The two writes are issued in that order and are not transactional.

mod memory;
mod redis_store;

pub use memory::{MemoryStore, spawn_cleanup_task};
pub use redis_store::RedisStore;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use crate::config::{CacheBackend, CacheConfig};
use crate::snapshot::{KeySpace, Snapshot, SnapshotKey};
use crate::Result;

/// How often the memory backend sweeps expired entries
const MEMORY_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

// ============================================================================
// Store trait
// ============================================================================

/// Reachability of the backing store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreHealth {
    /// Store answered
    Connected,
    /// Store could not be reached
    Disconnected(String),
}

impl StoreHealth {
    /// Returns `true` if the store answered.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// Minimal string key-value store with optional per-key expiry
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Set `key` to `value`, expiring after `ttl`
    async fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Set `key` to `value` with no expiry
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Read `key`, `None` when absent or expired
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Check whether the store answers
    async fn health(&self) -> StoreHealth;

    /// Release the connection
    async fn close(&self) {}
}

/// Build the store selected in configuration.
///
/// A Redis store that cannot connect is still returned; see [`RedisStore::connect`].
/// A memory store gets a background sweep that lives as long as the store.
pub async fn open_store(config: &CacheConfig) -> Result<Arc<dyn KeyValueStore>> {
    match config.backend {
        CacheBackend::Redis => Ok(Arc::new(RedisStore::connect(&config.url).await?)),
        CacheBackend::Memory => {
            let store = Arc::new(MemoryStore::new());
            spawn_cleanup_task(Arc::clone(&store), MEMORY_SWEEP_INTERVAL);
            Ok(store)
        }
    }
}

// ============================================================================
// Snapshot cache
// ============================================================================

/// Records snapshots into a [`KeyValueStore`] and serves the latest one
#[derive(Clone)]
pub struct SnapshotCache {
    store: Arc<dyn KeyValueStore>,
    keys: KeySpace,
    ttl: Duration,
}

impl SnapshotCache {
    /// Create a cache over `store`
    pub fn new(store: Arc<dyn KeyValueStore>, keys: KeySpace, ttl: Duration) -> Self {
        Self { store, keys, ttl }
    }

    /// Create a cache using the configured prefix and TTL
    pub fn from_config(store: Arc<dyn KeyValueStore>, config: &CacheConfig) -> Self {
        Self::new(store, KeySpace::new(&config.key_prefix), config.snapshot_ttl)
    }

    /// Backing store
    #[must_use]
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// Expiry of timestamped entries
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Write the timestamped entry, then the latest pointer.
    ///
    /// Returns the timestamped key. If the second write fails the first one
    /// is left in place.
    pub async fn record(&self, snapshot: &Snapshot) -> Result<SnapshotKey> {
        let json = snapshot.to_json()?;
        let key = self.keys.snapshot_key(Utc::now());

        self.store
            .set_with_expiry(key.as_str(), &json, self.ttl)
            .await?;
        debug!(
            store = self.store.name(),
            key = %key,
            ttl_secs = self.ttl.as_secs(),
            "Snapshot key written"
        );

        let latest = self.keys.latest();
        self.store.set(&latest, &json).await?;
        debug!(store = self.store.name(), key = %latest, "Latest pointer updated");

        Ok(key)
    }

    /// Read the latest pointer, `None` if nothing was recorded
    pub async fn fetch_latest(&self) -> Result<Option<Snapshot>> {
        self.fetch_raw(&self.keys.latest()).await
    }

    /// Read one timestamped entry, `None` once it has expired
    pub async fn fetch(&self, key: &SnapshotKey) -> Result<Option<Snapshot>> {
        self.fetch_raw(key.as_str()).await
    }

    async fn fetch_raw(&self, key: &str) -> Result<Option<Snapshot>> {
        match self.store.get(key).await? {
            Some(raw) => Snapshot::from_json(&raw).map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Mutex;

    /// Store that logs every call and can be told to fail
    #[derive(Default)]
    struct RecordingStore {
        calls: Mutex<Vec<String>>,
        fail_latest: bool,
        inner: MemoryStore,
    }

    #[async_trait]
    impl KeyValueStore for RecordingStore {
        fn name(&self) -> &str {
            "recording"
        }

        async fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("setex {key} {}", ttl.as_secs()));
            self.inner.set_with_expiry(key, value, ttl).await
        }

        async fn set(&self, key: &str, value: &str) -> Result<()> {
            self.calls.lock().unwrap().push(format!("set {key}"));
            if self.fail_latest {
                return Err(Error::Cache("READONLY".to_string()));
            }
            self.inner.set(key, value).await
        }

        async fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key).await
        }

        async fn health(&self) -> StoreHealth {
            StoreHealth::Connected
        }
    }

    fn cache_over(store: Arc<dyn KeyValueStore>) -> SnapshotCache {
        SnapshotCache::new(store, KeySpace::default(), Duration::from_secs(3600))
    }

    #[tokio::test]
    async fn record_writes_snapshot_key_before_latest() {
        let store = Arc::new(RecordingStore::default());
        let cache = cache_over(store.clone());

        let key = cache.record(&Snapshot::new(json!({"a": 1}))).await.unwrap();

        let calls = store.calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![format!("setex {key} 3600"), "set availability:latest".to_string()]
        );
        assert!(key.as_str().starts_with("availability:"));
    }

    #[tokio::test]
    async fn latest_and_snapshot_key_hold_same_document() {
        let cache = cache_over(Arc::new(MemoryStore::new()));
        let snapshot = Snapshot::new(json!({"team": "A", "available": true}));

        let key = cache.record(&snapshot).await.unwrap();

        assert_eq!(cache.fetch_latest().await.unwrap(), Some(snapshot.clone()));
        assert_eq!(cache.fetch(&key).await.unwrap(), Some(snapshot));
    }

    #[tokio::test]
    async fn fetch_latest_on_empty_store_is_none() {
        let cache = cache_over(Arc::new(MemoryStore::new()));
        assert!(cache.fetch_latest().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_latest_write_keeps_snapshot_key() {
        let store = Arc::new(RecordingStore {
            fail_latest: true,
            ..Default::default()
        });
        let cache = cache_over(store.clone());

        let err = cache.record(&Snapshot::new(json!(1))).await.unwrap_err();
        assert!(matches!(err, Error::Cache(_)));

        assert!(cache.fetch_latest().await.unwrap().is_none());
        assert_eq!(store.inner.len(), 1);
    }

    #[tokio::test]
    async fn snapshot_key_expires_but_latest_survives() {
        let cache = SnapshotCache::new(
            Arc::new(MemoryStore::new()),
            KeySpace::default(),
            Duration::from_millis(50),
        );
        let snapshot = Snapshot::new(json!({"day": "mon"}));

        let key = cache.record(&snapshot).await.unwrap();
        assert!(cache.fetch(&key).await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(120)).await;

        assert!(cache.fetch(&key).await.unwrap().is_none());
        assert_eq!(cache.fetch_latest().await.unwrap(), Some(snapshot));
    }

    #[tokio::test]
    async fn corrupt_latest_value_is_json_error() {
        let store = Arc::new(MemoryStore::new());
        store.set("availability:latest", "{oops").await.unwrap();
        let cache = cache_over(store);

        let err = cache.fetch_latest().await.unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }
}
