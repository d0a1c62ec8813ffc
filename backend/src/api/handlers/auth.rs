//! Dashboard login handlers (`/api/auth`).

use std::sync::Arc;

use axum::{
    extract::State,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;
use utoipa::{OpenApi, ToSchema};

use crate::api::dto::SuccessResponse;
use crate::api::middleware::rate_limit::{rate_limit_middleware, RateLimiter};
use crate::api::SharedState;
use crate::error::{AppError, Result};
use crate::services::metrics_service;

/// Auth routes; login attempts go through `limiter`.
pub fn router(limiter: Arc<RateLimiter>) -> Router<SharedState> {
    Router::new()
        .route(
            "/login",
            post(login).layer(middleware::from_fn_with_state(limiter, rate_limit_middleware)),
        )
        .route("/logout", post(logout))
        .route("/session", get(session))
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl LoginRequest {
    fn credentials(&self) -> Option<(&str, &str)> {
        let username = self.username.as_deref().filter(|u| !u.is_empty())?;
        let password = self.password.as_deref().filter(|p| !p.is_empty())?;
        Some((username, password))
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionStatus {
    pub authenticated: bool,
}

/// POST /api/auth/login
#[utoipa::path(
    post,
    path = "/login",
    context_path = "/api/auth",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; session cookie set", body = SuccessResponse),
        (status = 400, description = "Missing username or password", body = crate::api::openapi::ErrorResponse),
        (status = 401, description = "Invalid username or password", body = crate::api::openapi::ErrorResponse),
        (status = 429, description = "Too many login attempts"),
        (status = 500, description = "Login credentials not configured", body = crate::api::openapi::ErrorResponse),
    )
)]
pub async fn login(
    State(state): State<SharedState>,
    cookies: Cookies,
    payload: Option<Json<LoginRequest>>,
) -> Result<Json<SuccessResponse>> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    let (username, password) = payload.credentials().ok_or_else(|| {
        AppError::Validation("Username and password are required".to_string())
    })?;

    let token = match state.auth_service.login(username, password) {
        Ok(token) => {
            metrics_service::record_login_attempt(true);
            token
        }
        Err(err) => {
            if matches!(err, AppError::Authentication(_)) {
                metrics_service::record_login_attempt(false);
            }
            return Err(err);
        }
    };

    cookies.add(state.auth_service.session_cookie(token));
    Ok(Json(SuccessResponse::ok()))
}

/// POST /api/auth/logout
#[utoipa::path(
    post,
    path = "/logout",
    context_path = "/api/auth",
    tag = "auth",
    responses((status = 200, description = "Session cookie cleared", body = SuccessResponse))
)]
pub async fn logout(State(state): State<SharedState>, cookies: Cookies) -> Json<SuccessResponse> {
    cookies.add(state.auth_service.cleared_session_cookie());
    Json(SuccessResponse::ok())
}

/// GET /api/auth/session
#[utoipa::path(
    get,
    path = "/session",
    context_path = "/api/auth",
    tag = "auth",
    responses((status = 200, description = "Whether the session cookie is valid", body = SessionStatus))
)]
pub async fn session(State(state): State<SharedState>, cookies: Cookies) -> Json<SessionStatus> {
    Json(SessionStatus {
        authenticated: state.auth_service.session_from_cookies(&cookies).is_some(),
    })
}

#[derive(OpenApi)]
#[openapi(
    paths(login, logout, session),
    components(schemas(LoginRequest, SessionStatus, SuccessResponse))
)]
pub struct AuthApiDoc;
