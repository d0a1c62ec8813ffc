//! Rate limiting middleware.
//!
//! Fixed-window limiter keyed by client IP, used to slow down login
//! brute forcing.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    http::{header::HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tokio::sync::RwLock;

use crate::services::metrics_service;

/// Rate limiter that tracks requests per key.
#[derive(Debug)]
pub struct RateLimiter {
    /// Map of key -> (request count, window start time)
    requests: Arc<RwLock<HashMap<String, (u32, Instant)>>>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    /// Allow `max_requests` per key in each `window_secs` window.
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            requests: Arc::new(RwLock::new(HashMap::new())),
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }

    /// Count a request against `key`.
    ///
    /// Returns `Ok(remaining)` if allowed, or `Err(retry_after_secs)` once
    /// the limit has been exceeded.
    pub async fn check_rate_limit(&self, key: &str) -> Result<u32, u64> {
        let now = Instant::now();
        let mut requests = self.requests.write().await;

        let entry = requests.entry(key.to_string()).or_insert((0, now));

        if now.duration_since(entry.1) >= self.window {
            entry.0 = 1;
            entry.1 = now;
            return Ok(self.max_requests.saturating_sub(1));
        }

        if entry.0 >= self.max_requests {
            let elapsed = now.duration_since(entry.1).as_secs();
            let retry_after = self.window.as_secs().saturating_sub(elapsed);
            return Err(retry_after.max(1));
        }

        entry.0 += 1;
        Ok(self.max_requests.saturating_sub(entry.0))
    }

    /// Drop entries whose window has passed.
    pub async fn cleanup_expired(&self) {
        let now = Instant::now();
        let mut requests = self.requests.write().await;
        requests.retain(|_, (_, window_start)| now.duration_since(*window_start) < self.window);
    }
}

/// Per-IP rate limiting middleware.
///
/// Returns 429 with `Retry-After` once the limit is exceeded and adds
/// `X-RateLimit-*` headers to every response.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let key = extract_client_ip(&request);

    match limiter.check_rate_limit(&key).await {
        Ok(remaining) => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert("X-RateLimit-Limit", HeaderValue::from(limiter.max_requests));
            headers.insert("X-RateLimit-Remaining", HeaderValue::from(remaining));
            response
        }
        Err(retry_after) => {
            tracing::warn!(client = %key, retry_after, "Rate limit exceeded");
            metrics_service::record_rate_limited("login");

            let mut response = (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({
                    "error": "Too many requests. Please try again later.",
                    "code": "RATE_LIMITED",
                    "message": "Too many requests. Please try again later.",
                })),
            )
                .into_response();

            let headers = response.headers_mut();
            headers.insert("Retry-After", HeaderValue::from(retry_after));
            headers.insert("X-RateLimit-Limit", HeaderValue::from(limiter.max_requests));
            headers.insert("X-RateLimit-Remaining", HeaderValue::from_static("0"));
            response
        }
    }
}

/// Client IP from the TCP peer address.
///
/// Proxy headers are not trusted since clients can spoof them. Without
/// `ConnectInfo` every request shares one bucket.
fn extract_client_ip(request: &Request) -> String {
    if let Some(connect_info) = request
        .extensions()
        .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
    {
        return format!("ip:{}", connect_info.0.ip());
    }

    "ip:unknown".to_string()
}
