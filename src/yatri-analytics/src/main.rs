//! Yatri Pulse — ride-hailing analytics aggregation service.
//!
//! Main entry point that wires the event store, aggregator, summary cache,
//! and HTTP query API together.

mod seed;

use clap::Parser;
use std::sync::Arc;
use tracing::{debug, error, info};
use yatri_aggregator::Aggregator;
use yatri_api::ApiServer;
use yatri_cache::SummaryCache;
use yatri_core::config::AppConfig;
use yatri_store::EventStore;

#[derive(Parser, Debug)]
#[command(name = "yatri-analytics")]
#[command(about = "Ride-hailing analytics aggregation service")]
#[command(version)]
struct Cli {
    /// Node identifier (overrides config)
    #[arg(long, env = "YATRI_ANALYTICS__NODE_ID")]
    node_id: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "YATRI_ANALYTICS__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Seed the event store with N synthetic Bangalore rides on startup
    #[arg(long)]
    seed_rides: Option<usize>,

    /// Number of days the synthetic rides span
    #[arg(long, default_value_t = 7)]
    seed_days: u32,

    /// RNG seed for the synthetic dataset
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "yatri_analytics=info,tower_http=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("Yatri Pulse starting up");

    // Load configuration
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    // Apply CLI overrides
    if let Some(node_id) = cli.node_id {
        config.node_id = node_id;
    }
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }

    info!(
        node_id = %config.node_id,
        http_port = config.api.http_port,
        summary_ttl_secs = config.cache.summary_ttl_secs,
        "Configuration loaded"
    );

    // Wire the pipeline: store -> aggregator -> cache -> API
    let store = Arc::new(EventStore::new());

    if let Some(n_rides) = cli.seed_rides {
        let appended = seed::seed_store(&store, n_rides, cli.seed_days, cli.seed);
        info!(rides = appended, days = cli.seed_days, "Seeded synthetic ride events");
    }

    let aggregator = Arc::new(Aggregator::new(store.clone()));
    let cache = Arc::new(SummaryCache::new(aggregator, &config.cache));

    // Spawn cache maintenance task
    let cache_for_maintenance = cache.clone();
    let maintenance_interval = config.cache.maintenance_interval_secs;
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(maintenance_interval));
        loop {
            interval.tick().await;
            let evicted = cache_for_maintenance.evict_expired();
            if evicted > 0 {
                debug!(evicted, "Evicted idle summary slots");
            }
        }
    });

    let api_server = ApiServer::new(config.clone(), cache);

    // Start metrics exporter
    if let Err(e) = api_server.start_metrics().await {
        error!(error = %e, "Failed to start metrics exporter");
    }

    info!("Yatri Pulse is ready to serve traffic");

    // Start HTTP server (blocks until shutdown)
    api_server.start_http().await?;

    Ok(())
}
