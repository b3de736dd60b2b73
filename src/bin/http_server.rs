//! HTTP Server Binary for the Causeway query API
//!
//! Loads the cleaned tables from a data directory into memory and serves read-only
//! search, entity and neighborhood endpoints over them.
//!
//! Usage:
//!   cargo run --bin http_server -- --host 0.0.0.0 --port 8080 --data-dir ./data

use causeway::{graph::import_directory, http::start_server};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "Causeway HTTP Server")]
#[command(about = "Read-only query API over cleaned Causeway tables", long_about = None)]
struct Args {
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Directory holding *_cleaned.csv tables
    #[arg(short, long, default_value = "./data")]
    data_dir: PathBuf,

    /// Relationship table name (before the _cleaned suffix)
    #[arg(long, default_value = "relationships.csv")]
    relationships: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    tracing::info!(data_dir = %args.data_dir.display(), "loading graph");
    let (graph, report) = import_directory(&args.data_dir, &args.relationships)?;
    tracing::info!(
        node_files = report.node_files.len(),
        nodes = report.nodes,
        edges = report.edges,
        skipped = report.edges_skipped,
        "import finished"
    );

    let addr = format!("{}:{}", args.host, args.port);

    // Set up graceful shutdown
    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install CTRL+C handler");
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown signal received, stopping server...");
    };

    // Run server with graceful shutdown
    tokio::select! {
        result = start_server(&addr, Arc::new(graph)) => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        () = shutdown_signal => {
            tracing::info!("Server shut down gracefully");
        }
    }

    Ok(())
}
