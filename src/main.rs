//! AgriDatum attestation service
//!
//! Accepts signed harvest records over HTTP, anchors each one as metadata in
//! a Cardano transaction paid for by the company wallet, and stores it.
//!
//! # Architecture Overview
//!
//! ```text
//!     Field agent ──▶ http (axum) ──▶ attestation service
//!                                        │
//!                     ┌──────────────────┼──────────────────────┐
//!                     ▼                  ▼                      ▼
//!               record + crypto     ledger (TxBuilder)        store
//!               canonical, Ed25519  CBOR, fee, witness        records.json
//!                                        │
//!                                        ▼
//!                                  chain (Blockfrost) ──▶ Cardano
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use agridatum::config::load_or_default;
use agridatum::http::HttpServer;
use agridatum::lifecycle::{build_service, spawn_signal_handler, Shutdown};
use agridatum::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "agridatum", version, about = "Harvest attestation service")]
struct Args {
    /// Path to the TOML config file (falls back to AGRIDATUM_CONFIG).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_or_default(args.config.as_deref())?;

    logging::init_logging(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        network = %config.chain.resolved_network(),
        chain_enabled = config.chain.enabled,
        anchoring_enabled = config.anchoring.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let service = Arc::new(build_service(&config).await?);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    let server = HttpServer::new(config, service);
    server.run(listener, shutdown.wait()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
