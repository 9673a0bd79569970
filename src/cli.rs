//! Command-line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Team availability snapshot service
#[derive(Parser, Debug)]
#[command(name = "teamavail")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "TEAMAVAIL_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "TEAMAVAIL_PORT")]
    pub port: Option<u16>,

    /// Host to bind to
    #[arg(long, env = "TEAMAVAIL_HOST")]
    pub host: Option<String>,

    /// Redis connection URL
    #[arg(long, env = "TEAMAVAIL_REDIS_URL", global = true)]
    pub redis_url: Option<String>,

    /// Directory for the history file
    #[arg(long, env = "TEAMAVAIL_OUTPUT_DIR", global = true)]
    pub output_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        long,
        default_value = "info",
        env = "TEAMAVAIL_LOG_LEVEL",
        global = true
    )]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "TEAMAVAIL_LOG_FORMAT", global = true)]
    pub log_format: Option<String>,

    /// Subcommand (optional - defaults to server mode)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP server (default)
    Serve,

    /// Print the latest stored snapshot
    Show {
        /// Read the history file instead of the cache
        #[arg(long)]
        file: bool,
    },
}
