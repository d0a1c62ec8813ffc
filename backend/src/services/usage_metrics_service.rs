//! Usage metrics: KPIs, daily trends, top sessions and per-user drill-downs.
//!
//! Every figure is computed by an aggregate query against the app tables.
//! Rust only assembles the grouped rows into response shapes, zero-fills
//! daily series and rounds fractional values.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::PgPool;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::play_history::{SQL_CLAMPED_PROGRESS, SQL_IS_COMPLETED, SQL_MINUTES};
use crate::models::user::{display_email, AppUser};
use crate::services::report_window::{
    day_series, fill_series, percentage, round2, DateWindow, StandardWindows,
};

/// Days covered by the per-user daily activity chart.
pub const USER_ACTIVITY_DAYS: u32 = 30;

/// Usage metrics service backed by the app database.
pub struct UsageMetricsService {
    db: PgPool,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Counts for today and the trailing 7 and 30 day windows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct PeriodCounts {
    pub today: i64,
    pub last7d: i64,
    pub last30d: i64,
}

/// Minutes listened for today and the trailing 7 and 30 day windows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct PeriodMinutes {
    pub today: f64,
    pub last7d: f64,
    pub last30d: f64,
}

/// Counts for the trailing 7 and 30 day windows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct RecentCounts {
    pub last7d: i64,
    pub last30d: i64,
}

/// Distinct active listeners.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct ActiveUsers {
    pub dau: i64,
    pub wau: i64,
    pub mau: i64,
}

/// Dashboard headline numbers.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct KpisResponse {
    pub new_users: PeriodCounts,
    pub active_users: ActiveUsers,
    pub plays: PeriodCounts,
    pub minutes_listened: PeriodMinutes,
    /// Percentage of plays in the last 30 days that were completed.
    pub completion_rate: f64,
    pub favorites: RecentCounts,
    pub feedback: RecentCounts,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub dau: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TrendsResponse {
    pub data: Vec<TrendPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DailyMinutesPoint {
    pub date: NaiveDate,
    pub minutes: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DailyMinutesResponse {
    pub data: Vec<DailyMinutesPoint>,
}

/// Most-played session over a window.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopSession {
    pub session_id: Uuid,
    pub title: Option<String>,
    pub plays: i64,
    pub minutes_listened: f64,
    pub avg_progress: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TopSessionsResponse {
    pub sessions: Vec<TopSession>,
}

/// Per-user engagement over the last 30 days.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserMetrics {
    pub user_id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub total_plays: i64,
    pub completed_plays: i64,
    pub completion_rate: f64,
    pub total_minutes: f64,
    pub avg_progress: f64,
    /// All-time favorites count.
    pub favorites: i64,
    /// All-time feedback count.
    pub feedback: i64,
    pub last_activity: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserMetricsPage {
    pub users: Vec<UserMetrics>,
    /// Total number of users, independent of paging.
    pub total: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub email_confirmed_at: Option<DateTime<Utc>>,
    pub last_sign_in_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub total_plays: i64,
    pub completed_plays: i64,
    pub completion_rate: f64,
    pub total_minutes: f64,
    pub avg_progress: f64,
    pub favorites: i64,
    pub feedback: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct PlaysAndMinutes {
    pub plays: i64,
    pub minutes: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct UserTimeBased {
    pub today: PlaysAndMinutes,
    pub last7d: PlaysAndMinutes,
    pub last30d: PlaysAndMinutes,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSessionStats {
    pub session_id: Uuid,
    pub title: Option<String>,
    pub plays: i64,
    pub total_minutes: f64,
    pub avg_progress: f64,
    pub last_played: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, ToSchema, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserFavorite {
    pub session_id: Uuid,
    pub title: Option<String>,
    pub favorited_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserFeedback {
    pub id: Uuid,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub app_version: Option<String>,
    pub device_info: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DailyActivityPoint {
    pub date: NaiveDate,
    pub plays: i64,
    pub minutes: f64,
}

/// Full drill-down for a single user.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserDetail {
    pub user: UserProfile,
    pub summary: UserSummary,
    pub time_based: UserTimeBased,
    pub sessions: Vec<UserSessionStats>,
    pub favorites: Vec<UserFavorite>,
    pub feedback: Vec<UserFeedback>,
    pub daily_activity: Vec<DailyActivityPoint>,
}

// ---------------------------------------------------------------------------
// Query rows
// ---------------------------------------------------------------------------

#[derive(Debug, Default, sqlx::FromRow)]
struct WindowCounts {
    today: i64,
    last_7d: i64,
    last_30d: i64,
}

#[derive(Debug, Default, sqlx::FromRow)]
struct PlayWindowStats {
    dau: i64,
    wau: i64,
    mau: i64,
    plays_today: i64,
    plays_7d: i64,
    plays_30d: i64,
    minutes_today: f64,
    minutes_7d: f64,
    minutes_30d: f64,
    completed_30d: i64,
}

#[derive(Debug, Default, sqlx::FromRow)]
struct EngagementCounts {
    favorites_7d: i64,
    favorites_30d: i64,
    feedback_7d: i64,
    feedback_30d: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct DailyBucket {
    day: NaiveDate,
    users: i64,
    plays: i64,
    minutes: f64,
}

#[derive(Debug, sqlx::FromRow)]
struct SessionAggregate {
    session_id: Uuid,
    title: Option<String>,
    plays: i64,
    minutes: f64,
    avg_progress: f64,
    last_played: Option<DateTime<Utc>>,
}

#[derive(Debug, sqlx::FromRow)]
struct UserMetricsRow {
    id: Uuid,
    email: Option<String>,
    created_at: DateTime<Utc>,
    total_plays: i64,
    completed_plays: i64,
    total_minutes: f64,
    avg_progress: f64,
    last_activity: Option<DateTime<Utc>>,
    favorites: i64,
    feedback: i64,
}

#[derive(Debug, Default, sqlx::FromRow)]
struct UserPlayTotals {
    total_plays: i64,
    completed_plays: i64,
    total_minutes: f64,
    avg_progress: f64,
    plays_today: i64,
    minutes_today: f64,
    plays_7d: i64,
    minutes_7d: f64,
    plays_30d: i64,
    minutes_30d: f64,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

impl UsageMetricsService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Headline KPIs for today, the last 7 days and the last 30 days.
    pub async fn get_kpis(&self) -> Result<KpisResponse> {
        let windows = StandardWindows::at(Utc::now());

        let (new_users, plays, engagement) = tokio::try_join!(
            self.new_user_counts(&windows),
            self.play_window_stats(&windows),
            self.engagement_counts(&windows),
        )?;

        Ok(assemble_kpis(new_users, plays, engagement))
    }

    async fn new_user_counts(&self, w: &StandardWindows) -> Result<WindowCounts> {
        let counts = sqlx::query_as::<_, WindowCounts>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE created_at >= $1) AS today,
                COUNT(*) FILTER (WHERE created_at >= $2) AS last_7d,
                COUNT(*) AS last_30d
            FROM users
            WHERE created_at >= $3 AND created_at <= $4
            "#,
        )
        .bind(w.today.start)
        .bind(w.last_7d.start)
        .bind(w.last_30d.start)
        .bind(w.last_30d.end)
        .fetch_one(&self.db)
        .await?;

        Ok(counts)
    }

    /// Play aggregates for the standard windows.
    ///
    /// WAU and MAU only have a lower bound; every other figure stops at the
    /// end of today.
    async fn play_window_stats(&self, w: &StandardWindows) -> Result<PlayWindowStats> {
        let sql = format!(
            r#"
            SELECT
                COUNT(DISTINCT ph.user_id) FILTER (WHERE ph.created_at >= $1 AND ph.created_at <= $4) AS dau,
                COUNT(DISTINCT ph.user_id) FILTER (WHERE ph.created_at >= $2) AS wau,
                COUNT(DISTINCT ph.user_id) AS mau,
                COUNT(*) FILTER (WHERE ph.created_at >= $1 AND ph.created_at <= $4) AS plays_today,
                COUNT(*) FILTER (WHERE ph.created_at >= $2 AND ph.created_at <= $4) AS plays_7d,
                COUNT(*) FILTER (WHERE ph.created_at <= $4) AS plays_30d,
                COALESCE(SUM({minutes}) FILTER (WHERE ph.created_at >= $1 AND ph.created_at <= $4), 0)::FLOAT8 AS minutes_today,
                COALESCE(SUM({minutes}) FILTER (WHERE ph.created_at >= $2 AND ph.created_at <= $4), 0)::FLOAT8 AS minutes_7d,
                COALESCE(SUM({minutes}) FILTER (WHERE ph.created_at <= $4), 0)::FLOAT8 AS minutes_30d,
                COUNT(*) FILTER (WHERE ph.created_at <= $4 AND {completed}) AS completed_30d
            FROM user_play_history ph
            LEFT JOIN unified_sessions s ON s.id = ph.session_id
            WHERE ph.created_at >= $3
            "#,
            minutes = SQL_MINUTES,
            completed = SQL_IS_COMPLETED,
        );

        let stats = sqlx::query_as::<_, PlayWindowStats>(&sql)
            .bind(w.today.start)
            .bind(w.last_7d.start)
            .bind(w.last_30d.start)
            .bind(w.last_30d.end)
            .fetch_one(&self.db)
            .await?;

        Ok(stats)
    }

    async fn engagement_counts(&self, w: &StandardWindows) -> Result<EngagementCounts> {
        let counts = sqlx::query_as::<_, EngagementCounts>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM favorites WHERE created_at >= $1 AND created_at <= $3) AS favorites_7d,
                (SELECT COUNT(*) FROM favorites WHERE created_at >= $2 AND created_at <= $3) AS favorites_30d,
                (SELECT COUNT(*) FROM feedback WHERE created_at >= $1 AND created_at <= $3) AS feedback_7d,
                (SELECT COUNT(*) FROM feedback WHERE created_at >= $2 AND created_at <= $3) AS feedback_30d
            "#,
        )
        .bind(w.last_7d.start)
        .bind(w.last_30d.start)
        .bind(w.last_30d.end)
        .fetch_one(&self.db)
        .await?;

        Ok(counts)
    }

    /// Daily active users for the last `days` days, zero-filled.
    pub async fn get_trends(&self, days: u32) -> Result<TrendsResponse> {
        let now = Utc::now();
        let buckets = self.daily_buckets(DateWindow::last_days(now, days)).await?;
        Ok(TrendsResponse {
            data: build_trend(&day_series(now, days), &buckets),
        })
    }

    /// Minutes listened per day for the last `days` days.
    ///
    /// An empty window yields an empty series rather than a run of zeros.
    pub async fn get_daily_minutes(&self, days: u32) -> Result<DailyMinutesResponse> {
        let now = Utc::now();
        let buckets = self.daily_buckets(DateWindow::last_days(now, days)).await?;
        Ok(DailyMinutesResponse {
            data: build_daily_minutes(&day_series(now, days), &buckets),
        })
    }

    async fn daily_buckets(&self, window: DateWindow) -> Result<Vec<DailyBucket>> {
        let sql = format!(
            r#"
            SELECT
                (ph.created_at AT TIME ZONE 'UTC')::DATE AS day,
                COUNT(DISTINCT ph.user_id) AS users,
                COUNT(*) AS plays,
                COALESCE(SUM({minutes}), 0)::FLOAT8 AS minutes
            FROM user_play_history ph
            LEFT JOIN unified_sessions s ON s.id = ph.session_id
            WHERE ph.created_at >= $1
            GROUP BY 1
            ORDER BY 1 ASC
            "#,
            minutes = SQL_MINUTES,
        );

        let buckets = sqlx::query_as::<_, DailyBucket>(&sql)
            .bind(window.start)
            .fetch_all(&self.db)
            .await?;

        Ok(buckets)
    }

    /// Sessions with the most plays over the last `days` days.
    pub async fn get_top_sessions(&self, days: u32, limit: i64) -> Result<TopSessionsResponse> {
        let window = DateWindow::last_days(Utc::now(), days);
        let sql = format!(
            r#"
            SELECT
                ph.session_id AS session_id,
                s.title AS title,
                COUNT(*) AS plays,
                COALESCE(SUM({minutes}), 0)::FLOAT8 AS minutes,
                COALESCE(AVG({progress}), 0)::FLOAT8 AS avg_progress,
                MAX(ph.created_at) AS last_played
            FROM user_play_history ph
            LEFT JOIN unified_sessions s ON s.id = ph.session_id
            WHERE ph.created_at >= $1
              AND ph.session_id IS NOT NULL
            GROUP BY ph.session_id, s.title
            ORDER BY plays DESC, minutes DESC, ph.session_id ASC
            LIMIT $2
            "#,
            minutes = SQL_MINUTES,
            progress = SQL_CLAMPED_PROGRESS,
        );

        let rows = sqlx::query_as::<_, SessionAggregate>(&sql)
            .bind(window.start)
            .bind(limit)
            .fetch_all(&self.db)
            .await?;

        Ok(TopSessionsResponse {
            sessions: rows.into_iter().map(TopSession::from).collect(),
        })
    }

    /// A page of users, newest first, with their 30-day engagement.
    pub async fn get_user_metrics(&self, limit: i64, offset: i64) -> Result<UserMetricsPage> {
        let window = DateWindow::last_days(Utc::now(), 30);
        let sql = format!(
            r#"
            SELECT
                u.id,
                u.email,
                u.created_at,
                p.total_plays,
                p.completed_plays,
                COALESCE(p.total_minutes, 0)::FLOAT8 AS total_minutes,
                COALESCE(p.avg_progress, 0)::FLOAT8 AS avg_progress,
                p.last_activity,
                fav.cnt AS favorites,
                fb.cnt AS feedback
            FROM users u
            LEFT JOIN LATERAL (
                SELECT
                    COUNT(*) AS total_plays,
                    COUNT(*) FILTER (WHERE {completed}) AS completed_plays,
                    SUM({minutes}) AS total_minutes,
                    AVG({progress}) AS avg_progress,
                    MAX(ph.created_at) AS last_activity
                FROM user_play_history ph
                LEFT JOIN unified_sessions s ON s.id = ph.session_id
                WHERE ph.user_id = u.id
                  AND ph.created_at >= $1
            ) p ON true
            LEFT JOIN LATERAL (
                SELECT COUNT(*) AS cnt FROM favorites f WHERE f.user_id = u.id
            ) fav ON true
            LEFT JOIN LATERAL (
                SELECT COUNT(*) AS cnt FROM feedback f WHERE f.user_id = u.id
            ) fb ON true
            ORDER BY u.created_at DESC, u.id ASC
            LIMIT $2 OFFSET $3
            "#,
            completed = SQL_IS_COMPLETED,
            minutes = SQL_MINUTES,
            progress = SQL_CLAMPED_PROGRESS,
        );

        let rows_fut = async {
            sqlx::query_as::<_, UserMetricsRow>(&sql)
                .bind(window.start)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.db)
                .await
                .map_err(AppError::from)
        };
        let total_fut = async {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
                .fetch_one(&self.db)
                .await
                .map_err(AppError::from)
        };

        let (rows, total) = tokio::try_join!(rows_fut, total_fut)?;

        Ok(UserMetricsPage {
            users: rows.into_iter().map(UserMetrics::from).collect(),
            total,
        })
    }

    /// Everything the dashboard shows for one user.
    pub async fn get_user_detail(&self, user_id: Uuid) -> Result<UserDetail> {
        let user = sqlx::query_as::<_, AppUser>(
            r#"
            SELECT id, email, email_confirmed_at, last_sign_in_at, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let now = Utc::now();
        let windows = StandardWindows::at(now);
        let activity_dates = day_series(now, USER_ACTIVITY_DAYS);

        let (totals, sessions, favorites, feedback, daily) = tokio::try_join!(
            self.user_play_totals(user_id, &windows),
            self.user_sessions(user_id),
            self.user_favorites(user_id),
            self.user_feedback(user_id),
            self.user_daily_buckets(user_id, &activity_dates),
        )?;

        tracing::debug!(
            user_id = %user_id,
            plays = totals.total_plays,
            sessions = sessions.len(),
            "Loaded user detail"
        );

        Ok(assemble_user_detail(
            user,
            totals,
            sessions,
            favorites,
            feedback,
            &activity_dates,
            &daily,
        ))
    }

    async fn user_play_totals(
        &self,
        user_id: Uuid,
        w: &StandardWindows,
    ) -> Result<UserPlayTotals> {
        let sql = format!(
            r#"
            SELECT
                COUNT(*) AS total_plays,
                COUNT(*) FILTER (WHERE {completed}) AS completed_plays,
                COALESCE(SUM({minutes}), 0)::FLOAT8 AS total_minutes,
                COALESCE(AVG({progress}), 0)::FLOAT8 AS avg_progress,
                COUNT(*) FILTER (WHERE ph.created_at >= $2 AND ph.created_at <= $3) AS plays_today,
                COALESCE(SUM({minutes}) FILTER (WHERE ph.created_at >= $2 AND ph.created_at <= $3), 0)::FLOAT8 AS minutes_today,
                COUNT(*) FILTER (WHERE ph.created_at >= $4) AS plays_7d,
                COALESCE(SUM({minutes}) FILTER (WHERE ph.created_at >= $4), 0)::FLOAT8 AS minutes_7d,
                COUNT(*) FILTER (WHERE ph.created_at >= $5) AS plays_30d,
                COALESCE(SUM({minutes}) FILTER (WHERE ph.created_at >= $5), 0)::FLOAT8 AS minutes_30d
            FROM user_play_history ph
            LEFT JOIN unified_sessions s ON s.id = ph.session_id
            WHERE ph.user_id = $1
            "#,
            completed = SQL_IS_COMPLETED,
            minutes = SQL_MINUTES,
            progress = SQL_CLAMPED_PROGRESS,
        );

        let totals = sqlx::query_as::<_, UserPlayTotals>(&sql)
            .bind(user_id)
            .bind(w.today.start)
            .bind(w.today.end)
            .bind(w.last_7d.start)
            .bind(w.last_30d.start)
            .fetch_one(&self.db)
            .await?;

        Ok(totals)
    }

    async fn user_sessions(&self, user_id: Uuid) -> Result<Vec<SessionAggregate>> {
        let sql = format!(
            r#"
            SELECT
                ph.session_id AS session_id,
                s.title AS title,
                COUNT(*) AS plays,
                COALESCE(SUM({minutes}), 0)::FLOAT8 AS minutes,
                COALESCE(AVG({progress}), 0)::FLOAT8 AS avg_progress,
                MAX(ph.created_at) AS last_played
            FROM user_play_history ph
            LEFT JOIN unified_sessions s ON s.id = ph.session_id
            WHERE ph.user_id = $1
              AND ph.session_id IS NOT NULL
            GROUP BY ph.session_id, s.title
            ORDER BY plays DESC, last_played DESC, ph.session_id ASC
            "#,
            minutes = SQL_MINUTES,
            progress = SQL_CLAMPED_PROGRESS,
        );

        let rows = sqlx::query_as::<_, SessionAggregate>(&sql)
            .bind(user_id)
            .fetch_all(&self.db)
            .await?;

        Ok(rows)
    }

    async fn user_favorites(&self, user_id: Uuid) -> Result<Vec<UserFavorite>> {
        let favorites = sqlx::query_as::<_, UserFavorite>(
            r#"
            SELECT f.session_id, s.title, f.created_at AS favorited_at
            FROM favorites f
            LEFT JOIN unified_sessions s ON s.id = f.session_id
            WHERE f.user_id = $1
            ORDER BY f.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(favorites)
    }

    async fn user_feedback(&self, user_id: Uuid) -> Result<Vec<UserFeedback>> {
        let feedback = sqlx::query_as::<_, UserFeedback>(
            r#"
            SELECT id, message, created_at, app_version, device_info
            FROM feedback
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(feedback)
    }

    async fn user_daily_buckets(
        &self,
        user_id: Uuid,
        dates: &[NaiveDate],
    ) -> Result<Vec<DailyBucket>> {
        let Some(first) = dates.first() else {
            return Ok(Vec::new());
        };
        let sql = format!(
            r#"
            SELECT
                (ph.created_at AT TIME ZONE 'UTC')::DATE AS day,
                COUNT(DISTINCT ph.user_id) AS users,
                COUNT(*) AS plays,
                COALESCE(SUM({minutes}), 0)::FLOAT8 AS minutes
            FROM user_play_history ph
            LEFT JOIN unified_sessions s ON s.id = ph.session_id
            WHERE ph.user_id = $1
              AND ph.created_at >= $2
            GROUP BY 1
            "#,
            minutes = SQL_MINUTES,
        );

        let buckets = sqlx::query_as::<_, DailyBucket>(&sql)
            .bind(user_id)
            .bind(first.and_time(chrono::NaiveTime::MIN).and_utc())
            .fetch_all(&self.db)
            .await?;

        Ok(buckets)
    }
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

fn assemble_kpis(
    new_users: WindowCounts,
    plays: PlayWindowStats,
    engagement: EngagementCounts,
) -> KpisResponse {
    KpisResponse {
        new_users: PeriodCounts {
            today: new_users.today,
            last7d: new_users.last_7d,
            last30d: new_users.last_30d,
        },
        active_users: ActiveUsers {
            dau: plays.dau,
            wau: plays.wau,
            mau: plays.mau,
        },
        plays: PeriodCounts {
            today: plays.plays_today,
            last7d: plays.plays_7d,
            last30d: plays.plays_30d,
        },
        minutes_listened: PeriodMinutes {
            today: round2(plays.minutes_today),
            last7d: round2(plays.minutes_7d),
            last30d: round2(plays.minutes_30d),
        },
        completion_rate: round2(percentage(plays.completed_30d, plays.plays_30d)),
        favorites: RecentCounts {
            last7d: engagement.favorites_7d,
            last30d: engagement.favorites_30d,
        },
        feedback: RecentCounts {
            last7d: engagement.feedback_7d,
            last30d: engagement.feedback_30d,
        },
    }
}

fn build_trend(dates: &[NaiveDate], buckets: &[DailyBucket]) -> Vec<TrendPoint> {
    let by_day: HashMap<NaiveDate, i64> = buckets.iter().map(|b| (b.day, b.users)).collect();
    fill_series(dates, &by_day)
        .into_iter()
        .map(|(date, dau)| TrendPoint { date, dau })
        .collect()
}

fn build_daily_minutes(dates: &[NaiveDate], buckets: &[DailyBucket]) -> Vec<DailyMinutesPoint> {
    if buckets.is_empty() {
        return Vec::new();
    }
    let by_day: HashMap<NaiveDate, f64> = buckets.iter().map(|b| (b.day, b.minutes)).collect();
    fill_series(dates, &by_day)
        .into_iter()
        .map(|(date, minutes)| DailyMinutesPoint {
            date,
            minutes: round2(minutes),
        })
        .collect()
}

fn build_daily_activity(dates: &[NaiveDate], buckets: &[DailyBucket]) -> Vec<DailyActivityPoint> {
    let by_day: HashMap<NaiveDate, PlaysAndMinutes> = buckets
        .iter()
        .map(|b| {
            (
                b.day,
                PlaysAndMinutes {
                    plays: b.plays,
                    minutes: b.minutes,
                },
            )
        })
        .collect();
    fill_series(dates, &by_day)
        .into_iter()
        .map(|(date, day)| DailyActivityPoint {
            date,
            plays: day.plays,
            minutes: round2(day.minutes),
        })
        .collect()
}

impl From<SessionAggregate> for TopSession {
    fn from(row: SessionAggregate) -> Self {
        Self {
            session_id: row.session_id,
            title: row.title,
            plays: row.plays,
            minutes_listened: round2(row.minutes),
            avg_progress: round2(row.avg_progress),
        }
    }
}

impl From<SessionAggregate> for UserSessionStats {
    fn from(row: SessionAggregate) -> Self {
        Self {
            session_id: row.session_id,
            title: row.title,
            plays: row.plays,
            total_minutes: round2(row.minutes),
            avg_progress: round2(row.avg_progress),
            last_played: row.last_played,
        }
    }
}

impl From<UserMetricsRow> for UserMetrics {
    fn from(row: UserMetricsRow) -> Self {
        Self {
            user_id: row.id,
            email: display_email(row.email.as_deref()),
            created_at: row.created_at,
            total_plays: row.total_plays,
            completed_plays: row.completed_plays,
            completion_rate: round2(percentage(row.completed_plays, row.total_plays)),
            total_minutes: round2(row.total_minutes),
            avg_progress: round2(row.avg_progress),
            favorites: row.favorites,
            feedback: row.feedback,
            last_activity: row.last_activity,
        }
    }
}

fn assemble_user_detail(
    user: AppUser,
    totals: UserPlayTotals,
    sessions: Vec<SessionAggregate>,
    favorites: Vec<UserFavorite>,
    feedback: Vec<UserFeedback>,
    activity_dates: &[NaiveDate],
    daily: &[DailyBucket],
) -> UserDetail {
    UserDetail {
        user: UserProfile {
            id: user.id,
            email: user.display_email(),
            created_at: user.created_at,
            email_confirmed_at: user.email_confirmed_at,
            last_sign_in_at: user.last_sign_in_at,
        },
        summary: UserSummary {
            total_plays: totals.total_plays,
            completed_plays: totals.completed_plays,
            completion_rate: round2(percentage(totals.completed_plays, totals.total_plays)),
            total_minutes: round2(totals.total_minutes),
            avg_progress: round2(totals.avg_progress),
            favorites: favorites.len() as i64,
            feedback: feedback.len() as i64,
        },
        time_based: UserTimeBased {
            today: PlaysAndMinutes {
                plays: totals.plays_today,
                minutes: round2(totals.minutes_today),
            },
            last7d: PlaysAndMinutes {
                plays: totals.plays_7d,
                minutes: round2(totals.minutes_7d),
            },
            last30d: PlaysAndMinutes {
                plays: totals.plays_30d,
                minutes: round2(totals.minutes_30d),
            },
        },
        sessions: sessions.into_iter().map(UserSessionStats::from).collect(),
        favorites,
        feedback,
        daily_activity: build_daily_activity(activity_dates, daily),
    }
}
