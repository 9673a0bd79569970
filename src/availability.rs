//! Submit and read availability snapshots
//!
//! A submit writes the history file first and the cache second. A history
//! failure stops the submit before the cache is touched. Neither step is
//! retried and the two writes are not atomic together: a crash in between
//! leaves the file newer than the cache.

use std::path::PathBuf;

use thiserror::Error;
use tracing::{error, info};

use crate::cache::{SnapshotCache, StoreHealth};
use crate::history::HistoryFile;
use crate::snapshot::{Snapshot, SnapshotKey};
use crate::Result;

/// Which store rejected a submit
#[derive(Error, Debug)]
pub enum SubmitError {
    /// History file write failed; the cache was not attempted
    #[error("history write failed: {0}")]
    History(#[source] crate::Error),

    /// History file was written but the cache write failed
    #[error("cache write failed: {0}")]
    Cache(#[source] crate::Error),
}

impl SubmitError {
    /// Short name of the failing store
    #[must_use]
    pub fn store(&self) -> &'static str {
        match self {
            Self::History(_) => "history",
            Self::Cache(_) => "cache",
        }
    }
}

/// Outcome of a successful submit
#[derive(Debug, Clone)]
pub struct SubmitReceipt {
    /// Timestamped cache key the snapshot was recorded under
    pub key: SnapshotKey,
    /// History file that now holds the snapshot
    pub history_path: PathBuf,
}

/// Dual-write front for the history file and snapshot cache
#[derive(Clone)]
pub struct AvailabilityService {
    history: HistoryFile,
    cache: SnapshotCache,
}

impl AvailabilityService {
    /// Combine the two stores
    #[must_use]
    pub fn new(history: HistoryFile, cache: SnapshotCache) -> Self {
        Self { history, cache }
    }

    /// History file handle
    #[must_use]
    pub fn history(&self) -> &HistoryFile {
        &self.history
    }

    /// Cache handle
    #[must_use]
    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    /// Persist to the history file, then record in the cache.
    ///
    /// A failure is logged here once; callers only map it to a response.
    pub async fn submit(
        &self,
        snapshot: &Snapshot,
    ) -> std::result::Result<SubmitReceipt, SubmitError> {
        if let Err(e) = self.history.persist(snapshot).await {
            error!(
                path = %self.history.path().display(),
                error = %e,
                "Error saving history to file"
            );
            return Err(SubmitError::History(e));
        }
        info!(path = %self.history.path().display(), "History saved to file");

        let key = match self.cache.record(snapshot).await {
            Ok(key) => key,
            Err(e) => {
                error!(
                    store = self.cache.store().name(),
                    error = %e,
                    "Error saving history to cache"
                );
                return Err(SubmitError::Cache(e));
            }
        };
        info!(store = self.cache.store().name(), key = %key, "History saved to cache");

        Ok(SubmitReceipt {
            key,
            history_path: self.history.path().to_path_buf(),
        })
    }

    /// Most recent snapshot from the cache's latest pointer
    pub async fn latest(&self) -> Result<Option<Snapshot>> {
        self.cache.fetch_latest().await
    }

    /// Reachability of the cache store
    pub async fn cache_health(&self) -> StoreHealth {
        self.cache.store().health().await
    }

    /// Release the cache connection
    pub async fn shutdown(&self) {
        self.cache.store().close().await;
    }
}
