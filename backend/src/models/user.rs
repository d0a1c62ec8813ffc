//! App user model.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Row of the `users` table (a view over the auth schema in production).
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct AppUser {
    pub id: Uuid,
    pub email: Option<String>,
    pub email_confirmed_at: Option<DateTime<Utc>>,
    pub last_sign_in_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Placeholder shown for accounts without an email address.
pub const NO_EMAIL: &str = "No email";

impl AppUser {
    pub fn display_email(&self) -> String {
        display_email(self.email.as_deref())
    }
}

/// Email as shown in reports, substituting [`NO_EMAIL`] for blanks.
pub fn display_email(email: Option<&str>) -> String {
    match email {
        Some(e) if !e.is_empty() => e.to_string(),
        _ => NO_EMAIL.to_string(),
    }
}
