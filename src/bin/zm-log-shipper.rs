//! # ZoneMinder Log Shipper
//!
//! Ships ZoneMinder log rows to Grafana Loki until stopped.
//!
//! ## Usage
//!
//! ```bash
//! ZM_DB_HOST=db ZM_DB_USER=zmuser ZM_DB_PASS=zmpass ZM_DB_NAME=zm \
//! LOKI_URL=http://loki:3100 zm-log-shipper --verbose
//! ```

use anyhow::Context;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tokio::signal;
use tracing::{error, info};

use zm_log_shipper::config::ConfigLoader;
use zm_log_shipper::logging::{self, LogFormat};
use zm_log_shipper::pipeline::run_shipper;

#[derive(Parser, Debug)]
#[command(name = "zm-log-shipper")]
#[command(about = "ZoneMinder Loki log shipper")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Debug-level log output
    #[arg(short, long)]
    verbose: bool,

    /// Optional TOML file with configuration keys; environment variables win
    #[arg(short, long, env = "ZM_SHIPPER_CONFIG")]
    config: Option<PathBuf>,

    /// Diagnostic log output format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    log_format: Format,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

impl From<Format> for LogFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Text => LogFormat::Text,
            Format::Json => LogFormat::Json,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_structured_logging(cli.verbose, cli.log_format.into());

    info!("Starting zm-log-shipper {}", env!("CARGO_PKG_VERSION"));

    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_file(path);
    }
    let config = loader.load().context("invalid configuration")?;

    if let Err(e) = run_shipper(&config, shutdown_signal()).await {
        error!(error = %e, "Shipper stopped");
        return Err(e).context("log shipping failed");
    }

    info!("Shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C");
        },
        _ = terminate => {
            info!("Received SIGTERM");
        },
    }
}
