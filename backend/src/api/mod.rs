//! API module - HTTP handlers and middleware.

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;

use crate::api::middleware::rate_limit::RateLimiter;
use crate::config::Config;
use crate::services::auth_service::AuthService;
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;
use std::sync::Arc;

/// Login attempts allowed per client IP per window.
pub const LOGIN_RATE_LIMIT: u32 = 30;
/// Login rate limit window in seconds.
pub const LOGIN_RATE_WINDOW_SECS: u64 = 60;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: PgPool,
    pub auth_service: Arc<AuthService>,
    pub login_limiter: Arc<RateLimiter>,
    pub metrics_handle: Option<Arc<PrometheusHandle>>,
}

impl AppState {
    pub fn new(config: Config, db: PgPool) -> Self {
        let config = Arc::new(config);
        Self {
            auth_service: Arc::new(AuthService::new(config.clone())),
            login_limiter: Arc::new(RateLimiter::new(LOGIN_RATE_LIMIT, LOGIN_RATE_WINDOW_SECS)),
            config,
            db,
            metrics_handle: None,
        }
    }

    /// Set the Prometheus metrics handle for rendering /metrics output.
    pub fn set_metrics_handle(&mut self, handle: PrometheusHandle) {
        self.metrics_handle = Some(Arc::new(handle));
    }
}

pub type SharedState = Arc<AppState>;
