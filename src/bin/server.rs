//! Pokédex Server Binary
//!
//! Starts the HTTP façade over a data directory.

use std::sync::Arc;

use clap::Parser;
use pokedex::network::Server;
use pokedex::{Config, Engine};
use tracing_subscriber::{fmt, EnvFilter};

/// Pokédex Server
#[derive(Parser, Debug)]
#[command(name = "pokedex-server")]
#[command(about = "HTTP backend for the Pokédex data engine")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./pokedex_data")]
    data_dir: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    listen: String,

    /// CSV file imported by /loadDatabase
    #[arg(short, long, default_value = "./data/pokedex.csv")]
    csv: String,

    /// Records per /getAll page
    #[arg(short, long, default_value = "60")]
    page_size: usize,

    /// Import the CSV before serving
    #[arg(long)]
    load: bool,
}

#[tokio::main]
async fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,pokedex=debug,tower_http=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("Pokédex Server v{}", pokedex::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);
    tracing::info!("Listen address: {}", args.listen);

    // Build config from args
    let config = match Config::builder()
        .data_dir(&args.data_dir)
        .listen_addr(&args.listen)
        .csv_path(&args.csv)
        .page_size(args.page_size)
        .build()
    {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    // Open engine
    let engine = match Engine::open(config.clone()) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    if args.load {
        match engine.load_csv() {
            Ok(count) => tracing::info!("Imported {} records from {}", count, args.csv),
            Err(e) => {
                tracing::error!("CSV import failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    tracing::info!("Engine initialized successfully (mode: {})", engine.mode());

    // Start server
    if let Err(e) = Server::new(config, engine).run().await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
