//! HTTP server lifecycle

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

use super::router::{AppState, create_router};
use crate::availability::AvailabilityService;
use crate::cache::{SnapshotCache, open_store};
use crate::config::Config;
use crate::history::HistoryFile;
use crate::{Error, Result};

/// Availability HTTP server
pub struct Server {
    /// Configuration
    config: Config,
    /// Dual-write service, owns the cache connection
    service: AvailabilityService,
}

impl Server {
    /// Open the cache store and assemble the service.
    ///
    /// An unreachable Redis does not fail startup; see [`crate::cache::RedisStore`].
    pub async fn new(config: Config) -> Result<Self> {
        let store = open_store(&config.cache).await?;
        let service = AvailabilityService::new(
            HistoryFile::from_config(&config.history),
            SnapshotCache::from_config(store, &config.cache),
        );

        info!(
            history = %service.history().path().display(),
            cache = service.cache().store().name(),
            ttl_secs = service.cache().ttl().as_secs(),
            "Stores ready"
        );

        Ok(Self { config, service })
    }

    /// Serve until Ctrl+C or SIGTERM, then close the cache connection
    pub async fn run(self) -> Result<()> {
        let addr = SocketAddr::new(
            self.config
                .server
                .host
                .parse()
                .map_err(|e| Error::Config(format!("Invalid host: {e}")))?,
            self.config.server.port,
        );

        let state = Arc::new(AppState {
            service: self.service.clone(),
        });
        let app = create_router(state, &self.config);

        let listener = TcpListener::bind(addr).await?;

        let base = format!("http://{}:{}", self.config.server.host, self.config.server.port);
        info!("============================================================");
        info!("TEAMAVAIL v{}", env!("CARGO_PKG_VERSION"));
        info!("============================================================");
        info!(host = %self.config.server.host, port = %self.config.server.port, "Listening");
        info!("  POST {base}/save-history");
        info!("  GET  {base}/api/latest-availability");
        info!("  GET  {base}/health");
        if self.config.static_files.enabled {
            info!("  GET  {base}/output/{}", self.config.history.file_name);
        }
        info!("============================================================");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| Error::Internal(e.to_string()))?;

        info!("Closing cache connection...");
        self.service.shutdown().await;

        Ok(())
    }
}

/// Shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
