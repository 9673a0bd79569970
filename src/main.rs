//! TeamAvail - team availability snapshot service
//!
//! Saves submitted snapshots to a history file and Redis, serves the latest.

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use teamavail::{
    api::Server,
    cache::{SnapshotCache, open_store},
    cli::{Cli, Command},
    config::Config,
    history::HistoryFile,
    setup_tracing,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Some(Command::Show { file }) => run_show(&config, file).await,
        Some(Command::Serve) | None => run_server(config).await,
    }
}

/// Load configuration and apply CLI overrides
fn load_config(cli: &Cli) -> teamavail::Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(ref host) = cli.host {
        config.server.host = host.clone();
    }
    if let Some(ref url) = cli.redis_url {
        config.cache.url = url.clone();
    }
    if let Some(ref dir) = cli.output_dir {
        config.history.output_dir = dir.clone();
    }
    Ok(config)
}

/// Print the latest snapshot from the cache or the history file
async fn run_show(config: &Config, from_file: bool) -> ExitCode {
    let latest = if from_file {
        HistoryFile::from_config(&config.history).load().await
    } else {
        match open_store(&config.cache).await {
            Ok(store) => {
                let cache = SnapshotCache::from_config(store.clone(), &config.cache);
                let latest = cache.fetch_latest().await;
                store.close().await;
                latest
            }
            Err(e) => Err(e),
        }
    };

    match latest {
        Ok(Some(snapshot)) => match snapshot.to_pretty_json() {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("❌ Failed to serialize snapshot: {e}");
                ExitCode::FAILURE
            }
        },
        Ok(None) => {
            println!("No data found");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("❌ Failed to read snapshot: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Run the HTTP server
async fn run_server(config: Config) -> ExitCode {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = config.server.port,
        history = %config.history.path().display(),
        cache = ?config.cache.backend,
        "Starting TeamAvail"
    );

    let server = match Server::new(config).await {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to create server: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = server.run().await {
        error!("Server error: {e}");
        return ExitCode::FAILURE;
    }

    info!("Server shutdown complete");
    ExitCode::SUCCESS
}
