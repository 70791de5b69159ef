//! API server — HTTP router, middleware, and the metrics exporter.

use crate::rest::{self, AppState};
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use yatri_aggregator::Aggregator;
use yatri_cache::SummaryCache;
use yatri_core::config::AppConfig;

/// Build the HTTP router over the given state. Shared with tests.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Summary query endpoint
        .route("/summary", get(rest::get_summary))
        // Operational endpoints
        .route("/health", get(rest::health_check))
        .route("/ready", get(rest::readiness))
        .route("/live", get(rest::liveness))
        // Middleware
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// HTTP server for the summary query API.
pub struct ApiServer {
    config: AppConfig,
    cache: Arc<SummaryCache<Aggregator>>,
}

impl ApiServer {
    pub fn new(config: AppConfig, cache: Arc<SummaryCache<Aggregator>>) -> Self {
        Self { config, cache }
    }

    /// Start the HTTP server. Blocks until shutdown.
    pub async fn start_http(&self) -> anyhow::Result<()> {
        let state = AppState {
            cache: self.cache.clone(),
            node_id: self.config.node_id.clone(),
            start_time: Instant::now(),
        };

        let app = build_router(state);

        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);

        info!(addr = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    /// Start the Prometheus metrics exporter on a separate port.
    pub async fn start_metrics(&self) -> anyhow::Result<()> {
        let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
        let handle = builder
            .with_http_listener(SocketAddr::new(
                self.config.api.host.parse()?,
                self.config.metrics.port,
            ))
            .install_recorder()?;

        info!(port = self.config.metrics.port, "Metrics exporter started");

        // Keep the handle alive
        std::mem::forget(handle);
        Ok(())
    }
}
