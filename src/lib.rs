//! TeamAvail Library
//!
//! Stores team availability snapshots submitted as arbitrary JSON.
//!
//! # Features
//!
//! - **Dual write**: every snapshot goes to an on-disk history file, then to Redis
//! - **Latest pointer**: `availability:latest` always holds the newest snapshot
//! - **Expiring history**: `availability:<millis>` keys live for one hour
//! - **Degraded mode**: the server keeps running when Redis is unreachable
//!
//! The two writes are sequential and not transactional. A history failure
//! stops the submit; a cache failure is reported after the file is written.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod availability;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod history;
pub mod snapshot;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => subscriber
            .with(fmt::layer().json())
            .try_init()
            .map_err(|e| Error::Internal(e.to_string())),
        _ => subscriber
            .with(fmt::layer())
            .try_init()
            .map_err(|e| Error::Internal(e.to_string())),
    }
}
