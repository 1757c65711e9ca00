//! SeriesIO Node - Per-node metric store agent
//!
//! This binary serves a node's local metric database files over HTTP.

use anyhow::Result;
use clap::Parser;
use seriesio_common::Config;
use seriesio_node::api::{self, AppState};
use seriesio_node::TsdbMerge;
use seriesio_store::{HealPipeline, InventoryCache, PathMapper};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "seriesio-node")]
#[command(about = "SeriesIO per-node metric store agent")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "/etc/seriesio/node.toml")]
    config: String,

    /// Listen address for the HTTP API
    #[arg(short, long)]
    listen: Option<String>,

    /// Root directory of the metric database tree
    #[arg(long)]
    root: Option<PathBuf>,

    /// Staging directory for heal uploads
    #[arg(long)]
    staging_dir: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load config file if it exists
    let config: Config = if std::path::Path::new(&args.config).exists() {
        let config_str = std::fs::read_to_string(&args.config)?;
        toml::from_str(&config_str).unwrap_or_else(|e| {
            eprintln!("Warning: Failed to parse config file: {e}");
            Config::default()
        })
    } else {
        Config::default()
    };

    // Merge CLI args with config file (CLI takes precedence)
    let listen = args.listen.unwrap_or(config.node.listen);
    let root = args.root.unwrap_or(config.storage.root);
    let staging_dir = args.staging_dir.unwrap_or(config.storage.staging_dir);
    let log_level = if args.log_level == "info" {
        config.logging.level
    } else {
        args.log_level
    };

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting SeriesIO node agent");
    info!("Config file: {}", args.config);
    info!("Metric root: {}", root.display());
    info!("Staging directory: {}", staging_dir.display());

    // The heal pipeline requires the staging directory to exist before
    // the first upload arrives; the metric root must exist for the
    // inventory walk
    std::fs::create_dir_all(&staging_dir)?;
    std::fs::create_dir_all(&root)?;

    // Compose the store: inventory cache and heal pipeline share the
    // path mapper; the database merge capability is injected here
    let mapper = PathMapper::new(&root);
    let inventory = Arc::new(InventoryCache::new(mapper.clone()));
    let heal = HealPipeline::new(&staging_dir, Arc::new(TsdbMerge));

    let state = Arc::new(AppState {
        mapper,
        inventory: inventory.clone(),
        heal,
    });

    // Warm the inventory so early listing queries see a snapshot soon
    inventory.trigger_rebuild();

    let app = api::router(state);

    // Parse listen address
    let addr: SocketAddr = listen
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid listen address {listen}: {e}"))?;

    info!("Starting HTTP API server on {addr}");

    // Start server
    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutting down...");
        })
        .await?;

    info!("Node agent shut down gracefully");

    Ok(())
}
