//! Main entry point for the miso-data-downloader CLI

use anyhow::{anyhow, Context};
use clap::Parser;
use miso_data_downloader::cli::Cli;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

/// Initialize tracing on stderr with optional JSON formatting. Stdout is
/// reserved for table output.
fn init_tracing() {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("miso_data_downloader=info"));

    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    tokio::select! {
        result = cli.execute() => {
            result.context("command failed")?;
            Ok(())
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("Ctrl+C received - aborting");
            Err(anyhow!("interrupted"))
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
