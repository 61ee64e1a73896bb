//! Vigil - headless live telemetry sync client.

mod cli;
mod cmd_alert;
mod cmd_sync;

use std::path::Path;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use vigil_config::{Config, ConfigLoader, ConfigValidator, LoggingConfig};

use cli::{Cli, Commands};

/// Get the directory for rolling log files.
fn log_dir(logging: &LoggingConfig) -> std::path::PathBuf {
    match logging.dir {
        Some(ref dir) => ConfigLoader::expand_path(dir).into(),
        None => dirs::data_local_dir()
            .map(|d| d.join("vigil").join("logs"))
            .unwrap_or_else(|| std::path::PathBuf::from(".vigil/logs")),
    }
}

/// Initialize tracing with console and file output.
///
/// Log files rotate daily; `RUST_LOG` overrides `logging.level`.
fn init_tracing(logging: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let log_dir = log_dir(logging);
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("vigil")
        .filename_suffix("log")
        .max_log_files(14)
        .build(&log_dir)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Dropping the guard stops the writer thread.
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    // Console goes to stderr so `vigil snapshot` output stays clean JSON.
    let console = if logging.json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_ansi(true)
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(())
}

/// Load the configuration and apply CLI overrides.
fn load_config(path: &Path, base_url: Option<String>) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = ConfigLoader::load_or_default(path)?;
    if let Some(base_url) = base_url {
        config.backend.base_url = base_url;
    }
    Ok(config)
}

/// Validate the configuration file and print the findings.
fn check_config(path: &Path, base_url: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ConfigLoader::load(path)?;
    if let Some(base_url) = base_url {
        config.backend.base_url = base_url;
    }

    let warnings = ConfigValidator::validate(&config).into_result()?;
    for warning in &warnings {
        println!("warning: {}: {}", warning.path, warning.message);
    }
    println!("{}: OK", path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(Commands::CheckConfig) = cli.command {
        return check_config(&cli.config, cli.base_url);
    }

    let config = load_config(&cli.config, cli.base_url)?;
    init_tracing(&config.logging)?;

    let warnings = ConfigValidator::validate(&config).into_result()?;
    for warning in &warnings {
        warn!(path = %warning.path, "{}", warning.message);
    }
    info!(config = %cli.config.display(), "Configuration loaded");

    match cli.command {
        None => cmd_sync::run_watch(config, None, None).await,
        Some(Commands::Watch { module, level }) => cmd_sync::run_watch(config, module, level).await,
        Some(Commands::Snapshot { wait }) => {
            cmd_sync::run_snapshot(config, Duration::from_secs(wait)).await
        }
        Some(Commands::Ack { alert_id }) => cmd_alert::acknowledge(&config, &alert_id).await,
        Some(Commands::Dismiss { alert_id }) => cmd_alert::dismiss(&config, &alert_id).await,
        Some(Commands::Cleanup) => cmd_alert::cleanup(&config).await,
        Some(Commands::CheckConfig) => Ok(()),
    }
}
