//! Authentication middleware.
//!
//! Two gates protect the API:
//! - `Authorization: Basic <base64(user:pass)>` checked against the
//!   dashboard credentials, for `/api/metrics/*`
//! - the signed session cookie issued by `POST /api/auth/login`, for
//!   `/api/data/*`

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, WWW_AUTHENTICATE},
        HeaderValue,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine};
use tower_cookies::Cookies;

use crate::error::AppError;
use crate::services::auth_service::{AuthService, METRICS_REALM};

/// Extension holding the authenticated session subject.
#[derive(Debug, Clone)]
pub struct SessionExtension {
    pub username: String,
}

/// Split a `Basic` authorization header into username and password.
///
/// The password is everything after the first `:`.
pub fn parse_basic_auth(header: &str) -> Option<(String, String)> {
    let (scheme, encoded) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, pass) = decoded.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}

fn basic_challenge() -> Response {
    let mut response =
        AppError::Authentication("Authentication required".to_string()).into_response();
    let challenge = format!("Basic realm=\"{}\"", METRICS_REALM);
    if let Ok(value) = HeaderValue::from_str(&challenge) {
        response.headers_mut().insert(WWW_AUTHENTICATE, value);
    }
    response
}

/// Basic-auth gate for the metrics API.
pub async fn basic_auth_middleware(
    State(auth_service): State<Arc<AuthService>>,
    request: Request,
    next: Next,
) -> Response {
    let credentials = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(parse_basic_auth);

    let Some((username, password)) = credentials else {
        // Still surface a misconfigured server before asking for credentials.
        return match auth_service.verify_dashboard_credentials("", "") {
            Err(err @ AppError::Config(_)) => err.into_response(),
            _ => basic_challenge(),
        };
    };

    match auth_service.verify_dashboard_credentials(&username, &password) {
        Ok(()) => next.run(request).await,
        Err(AppError::Authentication(_)) => {
            tracing::debug!(username = %username, "Rejected metrics credentials");
            basic_challenge()
        }
        Err(err) => err.into_response(),
    }
}

/// Session-cookie gate for the data browser API.
///
/// Needs `CookieManagerLayer` further out in the stack.
pub async fn session_middleware(
    State(auth_service): State<Arc<AuthService>>,
    cookies: Cookies,
    mut request: Request,
    next: Next,
) -> Response {
    match auth_service.session_from_cookies(&cookies) {
        Some(claims) => {
            request.extensions_mut().insert(SessionExtension {
                username: claims.sub,
            });
            next.run(request).await
        }
        None => AppError::Authentication("Not authenticated".to_string()).into_response(),
    }
}
