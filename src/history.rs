//! On-disk history file
//!
//! Despite the name, only the most recent snapshot is kept: every
//! [`HistoryFile::persist`] replaces the file contents in full. The write is
//! not atomic; a failed write leaves the previous contents in an unspecified
//! state.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::HistoryConfig;
use crate::snapshot::Snapshot;
use crate::{Error, Result};

/// The single history file under the output directory
#[derive(Debug, Clone)]
pub struct HistoryFile {
    path: PathBuf,
}

impl HistoryFile {
    /// Use the file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Resolve the path from configuration
    #[must_use]
    pub fn from_config(config: &HistoryConfig) -> Self {
        Self::new(config.path())
    }

    /// Location of the file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the file with `snapshot` as indented JSON
    pub async fn persist(&self, snapshot: &Snapshot) -> Result<()> {
        let json = snapshot.to_pretty_json()?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| Error::history(&self.path, e))?;
        }

        tokio::fs::write(&self.path, json.as_bytes())
            .await
            .map_err(|e| Error::history(&self.path, e))?;

        debug!(path = %self.path.display(), bytes = json.len(), "History file written");
        Ok(())
    }

    /// Read back the stored snapshot, `None` if nothing was written yet
    pub async fn load(&self) -> Result<Option<Snapshot>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => Snapshot::from_json(&raw).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::history(&self.path, e)),
        }
    }
}
