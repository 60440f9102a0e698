//! # ais-runner
//!
//! Main entry point for the AIS ingestion worker.
//!
//! Loads a JSON configuration file, opens the vessel registry, subscribes to
//! the AIS feed, and reconciles vessel updates until Ctrl+C or SIGTERM.
//!
//! # Usage
//!
//! ```bash
//! AIS_API_KEY=... ais-runner config.json --log-level info
//! ```

use std::path::PathBuf;

use ais_core::ws::{StreamClient, StreamClientConfig};
use ais_ingest::broadcast::FrameBroadcaster;
use ais_ingest::{IngestPipeline, MemoryRegistry, RegistryStore, SqliteRegistry};
use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

/// AIS Ingestion & Reconciliation Runner.
#[derive(Parser)]
#[command(name = "ais-runner", about = "AIS Ingestion & Reconciliation Runner")]
struct Cli {
    /// Configuration file path (JSON).
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Optional log directory for file output.
    #[arg(long)]
    log_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load configuration and initialize logging
    let config = ais_core::config::load_config(&cli.config)?;
    ais_core::logging::init_logging(&cli.log_level, cli.log_dir.as_deref(), &config.logging);

    info!("ais-runner starting: config={}, log_level={}", cli.config.display(), cli.log_level);

    // 2. Credential (fatal if missing)
    let api_key = config.stream.resolve_api_key()?;

    // 3. Registry
    let store: Box<dyn RegistryStore> = match &config.registry.sqlite_path {
        Some(path) => Box::new(
            SqliteRegistry::open(path).with_context(|| format!("failed to open registry at {path}"))?,
        ),
        None => {
            info!("no sqlite_path configured, using in-memory registry");
            Box::new(MemoryRegistry::new())
        }
    };

    // 4. Pipeline and feed subscription
    let pipeline = IngestPipeline::start(store, &config, FrameBroadcaster::default());
    let mut client = StreamClient::new(StreamClientConfig::from_stream_config(&config.stream, api_key));
    client.start(pipeline.frame_handler());

    info!(
        "subscribed to {} bounding box(es), message types {:?}; press Ctrl+C to stop",
        config.stream.bounding_boxes.len(),
        config.stream.message_types,
    );

    // 5. Wait for shutdown signal
    wait_for_shutdown().await?;
    info!("shutdown signal received");

    // 6. Stop the feed first, then flush what is pending
    client.stop().await;
    let stats = pipeline.shutdown().await;

    info!(
        "ais-runner stopped: {} frames, {} registry writes; goodbye",
        stats.frames_received, stats.operations_applied,
    );
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown() -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res?,
        _ = sigterm.recv() => {},
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
