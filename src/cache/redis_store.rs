//! Redis-backed key-value store
//!
//! One [`ConnectionManager`] is shared by every request. It is established at
//! startup; if Redis is down at that point the error is logged and the process
//! keeps serving, with cache operations failing until a later call manages to
//! connect. Connect attempts are made once with a short timeout and never
//! retried with backoff, so a down server fails fast instead of stalling
//! requests. Once connected, reconnection after a dropped link is left to the
//! connection manager.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use super::{KeyValueStore, StoreHealth};
use crate::{Error, Result};

/// Upper bound on a single connect attempt
const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// Key-value store on a shared Redis connection
pub struct RedisStore {
    client: redis::Client,
    address: String,
    conn: Mutex<Option<ConnectionManager>>,
}

impl RedisStore {
    /// Open a client for `url` and try to connect once.
    ///
    /// Only a malformed URL is an error. A refused connection is logged and
    /// the store is returned disconnected.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| Error::Config(format!("Invalid Redis URL: {e}")))?;
        let address = client.get_connection_info().addr.to_string();

        let store = Self {
            client,
            address,
            conn: Mutex::new(None),
        };

        match store.connection().await {
            Ok(_) => info!(address = %store.address, "Connected to Redis"),
            Err(e) => error!(
                address = %store.address,
                error = %e,
                "Redis connection failed, cache operations will fail until it is reachable"
            ),
        }

        Ok(store)
    }

    /// `host:port` of the server, without credentials
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    async fn connection(&self) -> Result<ConnectionManager> {
        if let Some(conn) = self.conn.lock().await.as_ref() {
            return Ok(conn.clone());
        }

        // Connect without the lock held; concurrent callers may race here.
        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(0)
            .set_connection_timeout(CONNECT_TIMEOUT);
        let conn = ConnectionManager::new_with_config(self.client.clone(), config)
            .await
            .map_err(|e| Error::CacheConnection(format!("{}: {e}", self.address)))?;

        // First connection stored wins; a loser drops its own.
        let mut guard = self.conn.lock().await;
        Ok(guard.get_or_insert(conn).clone())
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    fn name(&self) -> &str {
        "redis"
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.connection().await?;
        // SETEX takes whole seconds; round sub-second TTLs up so they still expire.
        let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
        conn.set_ex::<_, _, ()>(key, value, secs).await.map_err(|e| {
            warn!(key = %key, error = %e, "SETEX failed");
            Error::from(e)
        })
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.connection().await?;
        conn.set::<_, _, ()>(key, value).await.map_err(|e| {
            warn!(key = %key, error = %e, "SET failed");
            Error::from(e)
        })
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection().await?;
        let value: Option<String> = conn.get(key).await.map_err(|e| {
            warn!(key = %key, error = %e, "GET failed");
            Error::from(e)
        })?;
        Ok(value)
    }

    async fn health(&self) -> StoreHealth {
        let mut conn = match self.connection().await {
            Ok(conn) => conn,
            Err(e) => return StoreHealth::Disconnected(e.to_string()),
        };
        let pong: redis::RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
        match pong {
            Ok(_) => StoreHealth::Connected,
            Err(e) => StoreHealth::Disconnected(e.to_string()),
        }
    }

    async fn close(&self) {
        if self.conn.lock().await.take().is_some() {
            info!(address = %self.address, "Redis connection closed");
        }
    }
}
