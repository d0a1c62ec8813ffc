//! In-app feedback model.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Row of `feedback`. Anonymous feedback has no `user_id`.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct Feedback {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub message: Option<String>,
    pub app_version: Option<String>,
    pub device_info: Option<String>,
    pub created_at: DateTime<Utc>,
}
