//! Prometheus metrics collection and HTTP request instrumentation.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

use axum::{
    body::Body,
    http::{Request, Response},
    middleware::Next,
};

use crate::error::{AppError, Result};

/// Install the process-wide Prometheus recorder and return the render handle.
///
/// Fails if a recorder is already installed.
pub fn init_metrics() -> Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| AppError::Internal(format!("Failed to install Prometheus recorder: {}", e)))
}

/// Axum middleware that records HTTP request metrics.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());

    let start = Instant::now();
    counter!("t1_http_requests_total", "method" => method.clone(), "path" => path.clone())
        .increment(1);
    gauge!("t1_http_requests_in_flight", "method" => method.clone(), "path" => path.clone())
        .increment(1.0);

    let response = next.run(request).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    histogram!("t1_http_request_duration_seconds", "method" => method.clone(), "path" => path.clone(), "status" => status.clone()).record(duration);
    counter!("t1_http_responses_total", "method" => method.clone(), "path" => path.clone(), "status" => status).increment(1);
    gauge!("t1_http_requests_in_flight", "method" => method, "path" => path).decrement(1.0);

    response
}

/// Replace UUID and numeric path segments with `:id` to bound label cardinality.
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|seg| {
            if seg.len() == 36 && seg.chars().filter(|c| *c == '-').count() == 4 {
                ":id"
            } else if !seg.is_empty() && seg.parse::<i64>().is_ok() {
                ":id"
            } else {
                seg
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Record a dashboard login attempt.
pub fn record_login_attempt(success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!("t1_login_attempts_total", "status" => status).increment(1);
}

/// Record a request turned away by a rate limiter.
pub fn record_rate_limited(scope: &'static str) {
    counter!("t1_rate_limited_total", "scope" => scope).increment(1);
}

/// Update database connection pool gauge metrics.
pub fn set_db_pool_gauges(pool: &sqlx::PgPool) {
    let size = pool.size() as f64;
    let idle = pool.num_idle() as f64;
    gauge!("t1_db_pool_connections_active").set(size - idle);
    gauge!("t1_db_pool_connections_idle").set(idle);
    gauge!("t1_db_pool_connections_max").set(pool.options().get_max_connections() as f64);
    gauge!("t1_db_pool_connections_size").set(size);
}
