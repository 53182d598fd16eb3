//! EmberKV Server Binary
//!
//! Starts the TCP server for EmberKV.

use std::sync::Arc;

use clap::Parser;
use emberkv::network::Server;
use emberkv::{Config, Engine};
use tracing_subscriber::{fmt, EnvFilter};

/// EmberKV Server
#[derive(Parser, Debug)]
#[command(name = "emberkv-server")]
#[command(about = "Log-structured key-value store server")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./emberkv_data")]
    data_dir: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:9000")]
    listen: String,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Reclaimable KiB that trigger a background merge
    #[arg(short = 'c', long, default_value = "1024")]
    compact_threshold_kb: u64,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,emberkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("EmberKV Server v{}", emberkv::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);
    tracing::info!("Listen address: {}", args.listen);

    // Build config from args
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .compact_threshold(args.compact_threshold_kb.saturating_mul(1024))
        .build();

    // Open engine
    let engine = match Engine::open(config.clone()) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(
        live_keys = engine.key_count(),
        active_generation = engine.active_generation(),
        "Engine initialized successfully"
    );

    let server = match Server::bind(config, Arc::clone(&engine)) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", args.listen, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
