// Main entry point - Dependency injection and server setup
use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{Router, routing::get};
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use transit_air_quality::application::dashboard_service::{DashboardService, ServiceOptions};
use transit_air_quality::application::streaming_service::StreamingAnalyticsService;
use transit_air_quality::infrastructure::config::load_config;
use transit_air_quality::infrastructure::influx_repository::InfluxRepository;
use transit_air_quality::infrastructure::query_cache::QueryCache;
use transit_air_quality::infrastructure::retry::{RetryConfig, wait_until_ready};
use transit_air_quality::presentation::app_state::AppState;
use transit_air_quality::presentation::handlers::{
    analytics, analytics_stream, export_csv, health_check, map, readiness, table,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Load configuration
    let config = load_config()?;
    let options = ServiceOptions::from_config(&config)?;

    // Create repository (infrastructure layer)
    let repository = Arc::new(InfluxRepository::new(&config.influx)?);
    let cache = Arc::new(QueryCache::new(Duration::from_secs(config.query.cache_ttl_secs)));

    // The store may still be starting; views report it until it answers
    let retry = RetryConfig::from(&config.readiness);
    match wait_until_ready(&*repository, &retry).await {
        Ok(()) => tracing::info!("Connected to store at {}", config.influx.host),
        Err(e) => tracing::error!("Store not ready, serving anyway: {}", e),
    }

    // Create services (application layer)
    let dashboard = DashboardService::new(repository, cache, options);
    let streaming = StreamingAnalyticsService::new(dashboard.clone());

    // Create application state
    let state = Arc::new(AppState {
        dashboard,
        streaming,
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/readyz", get(readiness))
        .route("/map", get(map))
        .route("/analytics", get(analytics))
        .route("/analytics/stream", get(analytics_stream))
        .route("/table", get(table))
        .route("/table/export.csv", get(export_csv))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config.server.bind.parse()?;
    tracing::info!("Starting transit-air-quality service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
