//! QuillKV Server Binary
//!
//! Starts the HTTP server for QuillKV.

use std::sync::Arc;

use clap::Parser;
use quillkv::network::Server;
use quillkv::{CommitMode, Config, Engine};
use tracing_subscriber::{fmt, EnvFilter};

/// QuillKV Server
#[derive(Parser, Debug)]
#[command(name = "quillkv-server")]
#[command(about = "Key-value store over HTTP backed by SQLite")]
#[command(version)]
struct Args {
    /// SQLite database file
    #[arg(short, long, default_value = "./quillkv_data/kv_store.db")]
    db: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:5000")]
    listen: String,

    /// Worker threads serving connections
    #[arg(short, long, default_value = "4")]
    workers: usize,

    /// Commit strategy: replay or atomic
    #[arg(short, long, default_value = "replay")]
    commit_mode: CommitMode,

    /// How long to wait on a locked database, in milliseconds
    #[arg(long, default_value = "5000")]
    busy_timeout_ms: u64,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,quillkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("QuillKV Server v{}", quillkv::VERSION);
    tracing::info!("Database: {}", args.db);
    tracing::info!("Listen address: {}", args.listen);

    let config = Config::builder()
        .db_path(&args.db)
        .listen_addr(&args.listen)
        .workers(args.workers)
        .commit_mode(args.commit_mode)
        .busy_timeout_ms(args.busy_timeout_ms)
        .build();

    let engine = match Engine::open(config.clone()) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Engine initialized successfully");

    let server = match Server::bind(config, engine) {
        Ok(s) => s,
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
