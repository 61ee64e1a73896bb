//! CLI definitions for vigil.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Vigil CLI.
#[derive(Parser)]
#[command(name = "vigil")]
#[command(about = "Headless live telemetry sync client")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml", global = true, env = "VIGIL_CONFIG")]
    pub config: PathBuf,

    /// Override the backend base URL
    #[arg(long, global = true, env = "VIGIL_BASE_URL")]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Keep the view in sync and log changes until interrupted (default)
    Watch {
        /// Only show logs from this module
        #[arg(long)]
        module: Option<String>,

        /// Only show logs at this level
        #[arg(long)]
        level: Option<String>,
    },

    /// Pull every feed once and print the view as JSON
    Snapshot {
        /// Seconds to wait for every feed to report
        #[arg(long, default_value_t = 15)]
        wait: u64,
    },

    /// Acknowledge an alert
    Ack {
        /// Alert ID
        alert_id: String,
    },

    /// Dismiss an alert
    Dismiss {
        /// Alert ID
        alert_id: String,
    },

    /// Ask the backend to clean up old logs
    Cleanup,

    /// Validate the configuration file
    CheckConfig,
}
