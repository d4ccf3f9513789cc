//! Conflux - telemetry collection service
//!
//! # Usage
//!
//! ```bash
//! # Run with the default config path
//! conflux
//!
//! # Explicit config and log level
//! conflux --config configs/example.toml --log-level debug
//! ```
//!
//! Exits 0 on clean shutdown, non-zero on a start failure or a fatal
//! component error.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use conflux_collector::default_registries;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Conflux - configuration-driven telemetry pipeline collector
#[derive(Parser, Debug)]
#[command(name = "conflux")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "conflux.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(error) = init_logging(&cli.log_level) {
        eprintln!("{error}");
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "collector exited with error");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let registries = default_registries();

    let config = conflux_config::load_file(&cli.config, &registries)?;
    tracing::info!(
        config = %cli.config.display(),
        receivers = config.receivers.len(),
        processors = config.processors.len(),
        exporters = config.exporters.len(),
        pipelines = config.pipelines.len(),
        "configuration loaded"
    );

    let service = conflux_pipeline::build(&config, &registries)?;
    service.start().await?;

    let fatal = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
            None
        }
        error = service.wait_for_fatal() => {
            tracing::error!(%error, "fatal component error, shutting down");
            Some(error)
        }
    };

    service.stop().await?;

    match fatal {
        Some(error) => Err(error.into()),
        None => Ok(()),
    }
}

/// Initialize the tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();

    Ok(())
}
