//! Unified session (playable content item) model.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Row of `unified_sessions`. `length` is the duration in seconds.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct UnifiedSession {
    pub id: Uuid,
    pub title: Option<String>,
    pub audio_url: Option<String>,
    pub position: Option<i32>,
    pub session_type: Option<String>,
    pub parent_id: Option<Uuid>,
    pub length: Option<i32>,
    pub tag: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
