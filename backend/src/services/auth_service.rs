//! Authentication service.
//!
//! Checks dashboard and login credentials against configuration and manages
//! the signed session cookie used by the dashboard UI.

use std::sync::Arc;

use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tower_cookies::cookie::SameSite;
use tower_cookies::{Cookie, Cookies};

use crate::config::Config;
use crate::error::{AppError, Result};

/// Name of the dashboard session cookie.
pub const SESSION_COOKIE_NAME: &str = "tier1_analytics_session";

/// Session lifetime: 7 days.
pub const SESSION_MAX_AGE_SECS: i64 = 7 * 24 * 60 * 60;

/// Realm advertised in `WWW-Authenticate` for the metrics API.
pub const METRICS_REALM: &str = "Tier1 Metrics Dashboard";

const SESSION_TOKEN_TYPE: &str = "session";

/// Session JWT claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (login username)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Always "session"
    pub token_type: String,
}

/// Authentication service
pub struct AuthService {
    config: Arc<Config>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(config: Arc<Config>) -> Self {
        let secret = config.session_secret.clone();
        Self {
            config,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Check the metrics API basic-auth credentials.
    pub fn verify_dashboard_credentials(&self, username: &str, password: &str) -> Result<()> {
        let (expected_user, expected_pass) = self.config.dashboard_credentials().ok_or_else(|| {
            AppError::Config("Server configuration error: Dashboard credentials not set".to_string())
        })?;

        if credentials_match(username, password, expected_user, expected_pass) {
            Ok(())
        } else {
            Err(AppError::Authentication("Invalid credentials".to_string()))
        }
    }

    /// Check login credentials and issue a session token on success.
    pub fn login(&self, username: &str, password: &str) -> Result<String> {
        let (expected_user, expected_pass) = self.config.login_credentials().ok_or_else(|| {
            tracing::error!("BASIC_AUTH_USERNAME or BASIC_AUTH_PASSWORD not configured");
            AppError::Config(
                "Server configuration error. Please contact administrator.".to_string(),
            )
        })?;

        if !credentials_match(username, password, expected_user, expected_pass) {
            tracing::warn!(username = %username, "Failed login attempt");
            return Err(AppError::Authentication(
                "Invalid username or password".to_string(),
            ));
        }

        tracing::info!(username = %username, "Dashboard login");
        self.issue_session_token(username)
    }

    /// Sign a session token for `subject`.
    pub fn issue_session_token(&self, subject: &str) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(SESSION_MAX_AGE_SECS)).timestamp(),
            token_type: SESSION_TOKEN_TYPE.to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Token encoding failed: {}", e)))
    }

    /// Validate and decode a session token
    pub fn validate_session_token(&self, token: &str) -> Result<Claims> {
        let token_data = self.decode_token(token)?;

        if token_data.claims.token_type != SESSION_TOKEN_TYPE {
            return Err(AppError::Authentication("Invalid token type".to_string()));
        }

        Ok(token_data.claims)
    }

    fn decode_token(&self, token: &str) -> Result<TokenData<Claims>> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|e| AppError::Authentication(format!("Invalid session: {}", e)))
    }

    /// Session cookie carrying a fresh session token.
    pub fn session_cookie(&self, token: String) -> Cookie<'static> {
        build_cookie(token, SESSION_MAX_AGE_SECS, self.config.is_production())
    }

    /// Cookie that expires the session cookie in the browser.
    pub fn cleared_session_cookie(&self) -> Cookie<'static> {
        build_cookie(String::new(), 0, self.config.is_production())
    }

    /// Validate the session cookie in `cookies`, if present.
    pub fn session_from_cookies(&self, cookies: &Cookies) -> Option<Claims> {
        self.validate_session_cookie(&cookies.get(SESSION_COOKIE_NAME)?)
    }

    /// Claims of a session cookie. Surrounding double quotes are ignored.
    pub fn validate_session_cookie(&self, cookie: &Cookie<'_>) -> Option<Claims> {
        let token = cookie.value_trimmed();
        if cookie.name() != SESSION_COOKIE_NAME || token.is_empty() {
            return None;
        }
        self.validate_session_token(token).ok()
    }
}

fn build_cookie(value: String, max_age_secs: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, value))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::seconds(max_age_secs))
        .secure(secure)
        .build()
}

fn credentials_match(username: &str, password: &str, expected_user: &str, expected_pass: &str) -> bool {
    // Evaluate both halves so timing does not reveal which one failed.
    let user_ok = constant_time_eq(username.as_bytes(), expected_user.as_bytes());
    let pass_ok = constant_time_eq(password.as_bytes(), expected_pass.as_bytes());
    user_ok & pass_ok
}

/// Compare two secrets without short-circuiting on the first differing byte.
///
/// Both inputs are reduced to HMAC tags first so unequal lengths do not leak
/// through timing either.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    const KEY: &[u8] = b"tier1-analytics-credential-compare";

    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(KEY) else {
        return false;
    };
    mac.update(a);
    let tag = mac.finalize().into_bytes();

    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(KEY) else {
        return false;
    };
    mac.update(b);
    mac.verify_slice(&tag).is_ok()
}
