//! Error types for the availability service

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for the availability service
pub type Result<T> = std::result::Result<T, Error>;

/// Availability service errors
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// History file could not be written or read
    #[error("History file error at {}: {source}", .path.display())]
    History {
        /// Path of the history file
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: io::Error,
    },

    /// Cache store unreachable or not yet connected
    #[error("Cache connection error: {0}")]
    CacheConnection(String),

    /// Cache store reachable but the operation failed
    #[error("Cache error: {0}")]
    Cache(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Wrap an I/O failure on the history file
    pub fn history(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::History {
            path: path.into(),
            source,
        }
    }

    /// Whether this error means the cache store could not be reached
    #[must_use]
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::CacheConnection(_))
    }
}

impl From<redis::RedisError> for Error {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error()
            || err.is_connection_dropped()
            || err.is_connection_refusal()
            || err.is_timeout()
        {
            Self::CacheConnection(err.to_string())
        } else {
            Self::Cache(err.to_string())
        }
    }
}
