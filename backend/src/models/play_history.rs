//! Play history model and the SQL fragments that interpret it.
//!
//! Progress is clamped into `[0, 100]` with NULL counted as 0. A play is
//! completed when its status is `completed` or its clamped progress is at
//! least 95. Minutes listened for a play is `progress / 100 * length / 60`,
//! where a missing session or NULL length counts as 0 seconds.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Row of `user_play_history`.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct PlayRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub session_id: Option<Uuid>,
    pub status: Option<String>,
    pub progress_percentage: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Clamped progress of a play row aliased as `ph`.
pub const SQL_CLAMPED_PROGRESS: &str =
    "LEAST(GREATEST(COALESCE(ph.progress_percentage, 0), 0), 100)";

/// Predicate matching completed plays of `ph`.
pub const SQL_IS_COMPLETED: &str = "(ph.status = 'completed' \
     OR LEAST(GREATEST(COALESCE(ph.progress_percentage, 0), 0), 100) >= 95)";

/// Minutes listened for `ph` joined to its session as `s`.
pub const SQL_MINUTES: &str = "(LEAST(GREATEST(COALESCE(ph.progress_percentage, 0), 0), 100) \
     / 100.0 * COALESCE(s.length, 0)::FLOAT8 / 60.0)";
