//! Route definitions for the API.

use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::get,
    Router,
};
use tower_cookies::CookieManagerLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use utoipa_swagger_ui::SwaggerUi;

use super::handlers;
use super::middleware::auth::{basic_auth_middleware, session_middleware};
use super::middleware::security_headers::security_headers_middleware;
use super::middleware::tracing::correlation_id_middleware;
use super::SharedState;
use crate::config::Config;
use crate::services::metrics_service;

/// Create the main API router
pub fn create_router(state: SharedState) -> Router {
    let openapi = super::openapi::build_openapi();

    Router::new()
        // Operational endpoints (no auth required)
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/metrics", get(handlers::health::prometheus_metrics))
        .merge(SwaggerUi::new("/swagger-ui").url("/api/openapi.json", openapi))
        .nest("/api", api_routes(&state))
        .layer(CookieManagerLayer::new())
        .layer(middleware::from_fn(metrics_service::metrics_middleware))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(correlation_id_middleware))
        .with_state(state)
}

fn api_routes(state: &SharedState) -> Router<SharedState> {
    Router::new()
        .nest(
            "/metrics",
            handlers::metrics::router().layer(middleware::from_fn_with_state(
                state.auth_service.clone(),
                basic_auth_middleware,
            )),
        )
        .nest("/auth", handlers::auth::router(state.login_limiter.clone()))
        .nest(
            "/data",
            handlers::data::router().layer(middleware::from_fn_with_state(
                state.auth_service.clone(),
                session_middleware,
            )),
        )
}

/// CORS policy: permissive, except in development where the dashboard dev
/// server runs on another origin and needs credentials.
pub fn cors_layer(config: &Config) -> CorsLayer {
    if !config.is_development() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            header::COOKIE,
        ])
        .allow_credentials(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::AppState;
    use axum::{
        body::Body,
        http::{header::SET_COOKIE, Request, StatusCode},
        response::Response,
    };
    use base64::{engine::general_purpose::STANDARD, Engine};
    use sqlx::postgres::PgPoolOptions;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    /// App whose pool never connects; only paths that reject before querying
    /// the database are exercised here.
    fn app(pairs: &[(&str, &str)]) -> Router {
        let mut vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        vars.insert("DATABASE_URL".into(), "postgres://localhost:1/none".into());
        vars.entry("SESSION_SECRET".into())
            .or_insert_with(|| "router-test".into());
        let config = Config::from_lookup(|key| vars.get(key).cloned()).unwrap();
        let db = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy(&config.database_url)
            .unwrap();
        create_router(Arc::new(AppState::new(config, db)))
    }

    fn configured_app() -> Router {
        app(&[
            ("DASHBOARD_USER", "ops"),
            ("DASHBOARD_PASS", "metrics:pw"),
            ("BASIC_AUTH_USERNAME", "admin"),
            ("BASIC_AUTH_PASSWORD", "hunter2"),
        ])
    }

    fn basic(user: &str, pass: &str) -> String {
        format!("Basic {}", STANDARD.encode(format!("{}:{}", user, pass)))
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn metrics_req(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, basic("ops", "metrics:pw"))
            .body(Body::empty())
            .unwrap()
    }

    fn login_req(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    // -- Metrics API auth and validation -----------------------------------

    #[tokio::test]
    async fn test_metrics_requires_basic_auth() {
        let resp = configured_app().oneshot(get_req("/api/metrics/kpis")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            resp.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Basic realm=\"Tier1 Metrics Dashboard\""
        );
    }

    #[tokio::test]
    async fn test_metrics_unconfigured_is_500() {
        let resp = app(&[])
            .oneshot(metrics_req("/api/metrics/kpis"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = json_body(resp).await;
        assert_eq!(
            json["message"],
            "Server configuration error: Dashboard credentials not set"
        );
    }

    #[tokio::test]
    async fn test_trends_rejects_bad_days() {
        for uri in ["/api/metrics/trends?days=0", "/api/metrics/trends?days=366"] {
            let resp = configured_app().oneshot(metrics_req(uri)).await.unwrap();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", uri);
            let json = json_body(resp).await;
            assert_eq!(json["message"], "Days must be between 1 and 365");
            assert_eq!(json["error"], "Days must be between 1 and 365");
        }
    }

    #[tokio::test]
    async fn test_daily_minutes_rejects_bad_days() {
        let resp = configured_app()
            .oneshot(metrics_req("/api/metrics/daily-minutes?days=-1"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_top_sessions_rejects_bad_limit() {
        let resp = configured_app()
            .oneshot(metrics_req("/api/metrics/top-sessions?limit=101"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = json_body(resp).await;
        assert_eq!(json["message"], "Limit must be between 1 and 100");
    }

    #[tokio::test]
    async fn test_users_rejects_bad_paging() {
        let resp = configured_app()
            .oneshot(metrics_req("/api/metrics/users?limit=201"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(resp).await["message"], "Limit must be between 1 and 200");

        let resp = configured_app()
            .oneshot(metrics_req("/api/metrics/users?offset=-1"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(resp).await["message"], "Offset must be >= 0");
    }

    #[tokio::test]
    async fn test_user_detail_rejects_malformed_id() {
        let resp = configured_app()
            .oneshot(metrics_req("/api/metrics/users/not-a-uuid"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_metrics_query_failure_is_500() {
        let resp = configured_app()
            .oneshot(metrics_req("/api/metrics/kpis"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = json_body(resp).await;
        assert_eq!(json["code"], "DATABASE_ERROR");
    }

    // -- Auth API ----------------------------------------------------------

    #[tokio::test]
    async fn test_login_requires_fields() {
        for body in [r#"{}"#, r#"{"username":"admin"}"#, r#"{"username":"","password":"x"}"#, "not json"] {
            let resp = configured_app().oneshot(login_req(body)).await.unwrap();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", body);
            assert_eq!(
                json_body(resp).await["message"],
                "Username and password are required"
            );
        }
    }

    #[tokio::test]
    async fn test_login_unconfigured_is_500() {
        let resp = app(&[])
            .oneshot(login_req(r#"{"username":"admin","password":"x"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json_body(resp).await["message"],
            "Server configuration error. Please contact administrator."
        );
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let resp = configured_app()
            .oneshot(login_req(r#"{"username":"admin","password":"nope"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert!(resp.headers().get(SET_COOKIE).is_none());
        assert_eq!(json_body(resp).await["message"], "Invalid username or password");
    }

    #[tokio::test]
    async fn test_login_sets_cookie_and_session_reports_it() {
        let app = configured_app();
        let resp = app
            .clone()
            .oneshot(login_req(r#"{"username":"admin","password":"hunter2"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let cookie = resp
            .headers()
            .get(SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(cookie.starts_with("tier1_analytics_session="));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(resp.headers().contains_key("x-ratelimit-remaining"));
        assert_eq!(json_body(resp).await, serde_json::json!({"success": true}));

        let pair = cookie.split(';').next().unwrap().to_string();
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/api/auth/session")
                    .header(header::COOKIE, pair)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(json_body(resp).await, serde_json::json!({"authenticated": true}));
    }

    #[tokio::test]
    async fn test_session_accepts_quoted_cookie_value() {
        let app = configured_app();
        let resp = app
            .clone()
            .oneshot(login_req(r#"{"username":"admin","password":"hunter2"}"#))
            .await
            .unwrap();
        let set_cookie = resp.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        let token = set_cookie
            .split(';')
            .next()
            .and_then(|pair| pair.split_once('='))
            .map(|(_, value)| value.to_string())
            .unwrap();

        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/api/auth/session")
                    .header(
                        header::COOKIE,
                        format!("theme=dark; tier1_analytics_session=\"{}\"", token),
                    )
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(json_body(resp).await, serde_json::json!({"authenticated": true}));
    }

    #[tokio::test]
    async fn test_session_without_cookie() {
        let resp = configured_app()
            .oneshot(get_req("/api/auth/session"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await, serde_json::json!({"authenticated": false}));
    }

    #[tokio::test]
    async fn test_logout_expires_cookie() {
        let resp = configured_app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/logout")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let cookie = resp.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.contains("Max-Age=0"));
        assert_eq!(json_body(resp).await, serde_json::json!({"success": true}));
    }

    #[tokio::test]
    async fn test_login_rate_limited() {
        let app = configured_app();
        for _ in 0..crate::api::LOGIN_RATE_LIMIT {
            let resp = app
                .clone()
                .oneshot(login_req(r#"{"username":"admin","password":"nope"}"#))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        }
        let resp = app
            .oneshot(login_req(r#"{"username":"admin","password":"hunter2"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(resp.headers().contains_key("retry-after"));
        let json = json_body(resp).await;
        assert_eq!(json["code"], "RATE_LIMITED");
        assert_eq!(json["error"], "Too many requests. Please try again later.");
    }

    // -- Data browser ------------------------------------------------------

    #[tokio::test]
    async fn test_data_requires_session() {
        let resp = configured_app()
            .oneshot(get_req("/api/data/summary"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_data_rejects_basic_auth() {
        let resp = configured_app()
            .oneshot(metrics_req("/api/data/users"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    // -- Operational -------------------------------------------------------

    #[tokio::test]
    async fn test_openapi_served() {
        let resp = configured_app()
            .oneshot(get_req("/api/openapi.json"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = json_body(resp).await;
        assert!(json["paths"]["/api/metrics/kpis"].is_object());
    }

    #[tokio::test]
    async fn test_health_reports_unavailable_database() {
        let resp = configured_app().oneshot(get_req("/health")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(resp.headers().contains_key("x-correlation-id"));
        assert_eq!(resp.headers().get("x-frame-options").unwrap(), "DENY");
        let json = json_body(resp).await;
        assert_eq!(json["status"], "unhealthy");
        assert_eq!(json["checks"]["database"]["status"], "unhealthy");
    }

    #[tokio::test]
    async fn test_prometheus_without_recorder() {
        let resp = configured_app().oneshot(get_req("/metrics")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    // -- CORS --------------------------------------------------------------

    #[tokio::test]
    async fn test_cors_development_allows_configured_origin() {
        let config = Config::from_lookup(|key| match key {
            "DATABASE_URL" => Some("postgres://localhost/none".into()),
            "ENVIRONMENT" => Some("development".into()),
            "CORS_ORIGINS" => Some("http://localhost:3000".into()),
            _ => None,
        })
        .unwrap();
        let app = Router::new()
            .route("/x", get(|| async { "ok" }))
            .layer(cors_layer(&config));

        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/x")
                    .header(header::ORIGIN, "http://localhost:3000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:3000"
        );
        assert_eq!(
            resp.headers()
                .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
                .unwrap(),
            "true"
        );
    }
}
