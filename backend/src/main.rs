//! Tier1 Analytics - Main Entry Point

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tower_http::trace::TraceLayer;

use tier1_analytics_backend::{
    api,
    config::Config,
    db,
    error::Result,
    services::metrics_service,
    telemetry,
};

/// How often stale login rate-limit buckets are dropped.
const RATE_LIMIT_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    // Hold the guard so pending spans flush on shutdown
    let _otel_guard = telemetry::init_tracing(&config)?;
    tracing::info!(environment = %config.environment, "Starting Tier1 Analytics");

    if config.dashboard_credentials().is_none() {
        tracing::warn!("DASHBOARD_USER/DASHBOARD_PASS not set; /api/metrics will return 500");
    }
    if config.login_credentials().is_none() {
        tracing::warn!("BASIC_AUTH_USERNAME/BASIC_AUTH_PASSWORD not set; login is disabled");
    }

    // Connect to database
    let db_pool = db::create_pool(&config).await?;
    tracing::info!("Connected to database");

    if config.run_migrations {
        db::run_migrations(&db_pool).await?;
        tracing::info!("Database migrations complete");
    }

    // Initialize Prometheus metrics recorder
    let metrics_handle = metrics_service::init_metrics()?;
    tracing::info!("Prometheus metrics recorder initialized");

    let cors = api::routes::cors_layer(&config);
    let addr: SocketAddr = config.bind_address.parse()?;

    let mut app_state = api::AppState::new(config, db_pool);
    app_state.set_metrics_handle(metrics_handle);
    let state = Arc::new(app_state);

    spawn_rate_limit_cleanup(state.clone());

    // Build router
    let app = api::routes::create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn spawn_rate_limit_cleanup(state: api::SharedState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(RATE_LIMIT_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            state.login_limiter.cleanup_expired().await;
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
