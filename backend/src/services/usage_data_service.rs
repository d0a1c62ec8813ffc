//! Raw table browsing for the dashboard's data pages.

use serde::Serialize;
use sqlx::{postgres::PgRow, FromRow, PgPool};
use utoipa::ToSchema;

use crate::error::{AppError, Result};

/// Tables exposed through the data browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataTable {
    Users,
    PlayHistory,
    Sessions,
    Favorites,
    Feedback,
}

impl DataTable {
    pub const ALL: [DataTable; 5] = [
        DataTable::Users,
        DataTable::PlayHistory,
        DataTable::Sessions,
        DataTable::Favorites,
        DataTable::Feedback,
    ];

    pub fn table_name(self) -> &'static str {
        match self {
            DataTable::Users => "users",
            DataTable::PlayHistory => "user_play_history",
            DataTable::Sessions => "unified_sessions",
            DataTable::Favorites => "favorites",
            DataTable::Feedback => "feedback",
        }
    }

    fn columns(self) -> &'static str {
        match self {
            DataTable::Users => {
                "id, email, email_confirmed_at, last_sign_in_at, created_at, updated_at"
            }
            DataTable::PlayHistory => {
                "id, user_id, session_id, status, progress_percentage, created_at, updated_at"
            }
            DataTable::Sessions => {
                "id, title, audio_url, position, session_type, parent_id, length, tag, created_at, updated_at"
            }
            DataTable::Favorites => "id, user_id, session_id, created_at",
            DataTable::Feedback => "id, user_id, message, app_version, device_info, created_at",
        }
    }
}

/// One page of raw rows.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DataPage<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Row counts of every browsable table.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DataSummary {
    pub user_count: i64,
    pub play_history_count: i64,
    pub sessions_count: i64,
    pub favorites_count: i64,
    pub feedback_count: i64,
}

pub struct UsageDataService {
    db: PgPool,
}

impl UsageDataService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Newest rows of `table` first.
    pub async fn list<T>(&self, table: DataTable, limit: i64, offset: i64) -> Result<DataPage<T>>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY created_at DESC, id ASC LIMIT $1 OFFSET $2",
            table.columns(),
            table.table_name()
        );

        let items_fut = async {
            sqlx::query_as::<_, T>(&sql)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.db)
                .await
                .map_err(AppError::from)
        };
        let (items, total) = tokio::try_join!(items_fut, self.count(table))?;

        Ok(DataPage {
            items,
            total,
            limit,
            offset,
        })
    }

    pub async fn count(&self, table: DataTable) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", table.table_name());
        let total = sqlx::query_scalar::<_, i64>(&sql)
            .fetch_one(&self.db)
            .await?;
        Ok(total)
    }

    pub async fn summary(&self) -> Result<DataSummary> {
        let (user_count, play_history_count, sessions_count, favorites_count, feedback_count) =
            tokio::try_join!(
                self.count(DataTable::Users),
                self.count(DataTable::PlayHistory),
                self.count(DataTable::Sessions),
                self.count(DataTable::Favorites),
                self.count(DataTable::Feedback),
            )?;

        Ok(DataSummary {
            user_count,
            play_history_count,
            sessions_count,
            favorites_count,
            feedback_count,
        })
    }
}
