//! Usage metrics API handlers (`/api/metrics`, basic auth).

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use utoipa::OpenApi;
use uuid::Uuid;

use crate::api::dto::{validate_days, validate_limit, DaysQuery, PageQuery, RankingQuery};
use crate::api::SharedState;
use crate::error::{AppError, Result};
use crate::services::usage_metrics_service::{
    DailyMinutesResponse, KpisResponse, TopSessionsResponse, TrendsResponse, UsageMetricsService,
    UserDetail, UserMetricsPage,
};

const DEFAULT_TREND_DAYS: u32 = 30;
const DEFAULT_MINUTES_DAYS: u32 = 14;
const DEFAULT_TOP_SESSION_DAYS: i64 = 7;
const DEFAULT_TOP_SESSION_LIMIT: i64 = 10;
const MAX_TOP_SESSION_LIMIT: i64 = 100;
const DEFAULT_USER_PAGE: i64 = 50;
const MAX_USER_PAGE: i64 = 200;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/kpis", get(get_kpis))
        .route("/trends", get(get_trends))
        .route("/daily-minutes", get(get_daily_minutes))
        .route("/top-sessions", get(get_top_sessions))
        .route("/users", get(list_user_metrics))
        .route("/users/:user_id", get(get_user_detail))
}

/// GET /api/metrics/kpis
#[utoipa::path(
    get,
    path = "/kpis",
    context_path = "/api/metrics",
    tag = "metrics",
    responses(
        (status = 200, description = "Headline KPIs", body = KpisResponse),
        (status = 401, description = "Missing or invalid credentials", body = crate::api::openapi::ErrorResponse),
    ),
    security(("basic_auth" = []))
)]
pub async fn get_kpis(State(state): State<SharedState>) -> Result<Json<KpisResponse>> {
    let service = UsageMetricsService::new(state.db.clone());
    Ok(Json(service.get_kpis().await?))
}

/// GET /api/metrics/trends
#[utoipa::path(
    get,
    path = "/trends",
    context_path = "/api/metrics",
    tag = "metrics",
    params(DaysQuery),
    responses(
        (status = 200, description = "Daily active users, zero-filled", body = TrendsResponse),
        (status = 400, description = "Invalid days", body = crate::api::openapi::ErrorResponse),
    ),
    security(("basic_auth" = []))
)]
pub async fn get_trends(
    State(state): State<SharedState>,
    Query(query): Query<DaysQuery>,
) -> Result<Json<TrendsResponse>> {
    let days = query.days_or(DEFAULT_TREND_DAYS)?;
    let service = UsageMetricsService::new(state.db.clone());
    Ok(Json(service.get_trends(days).await?))
}

/// GET /api/metrics/daily-minutes
#[utoipa::path(
    get,
    path = "/daily-minutes",
    context_path = "/api/metrics",
    tag = "metrics",
    params(DaysQuery),
    responses(
        (status = 200, description = "Minutes listened per day; empty when the window has no plays", body = DailyMinutesResponse),
        (status = 400, description = "Invalid days", body = crate::api::openapi::ErrorResponse),
    ),
    security(("basic_auth" = []))
)]
pub async fn get_daily_minutes(
    State(state): State<SharedState>,
    Query(query): Query<DaysQuery>,
) -> Result<Json<DailyMinutesResponse>> {
    let days = query.days_or(DEFAULT_MINUTES_DAYS)?;
    let service = UsageMetricsService::new(state.db.clone());
    Ok(Json(service.get_daily_minutes(days).await?))
}

/// GET /api/metrics/top-sessions
#[utoipa::path(
    get,
    path = "/top-sessions",
    context_path = "/api/metrics",
    tag = "metrics",
    params(RankingQuery),
    responses(
        (status = 200, description = "Most played sessions", body = TopSessionsResponse),
        (status = 400, description = "Invalid days or limit", body = crate::api::openapi::ErrorResponse),
    ),
    security(("basic_auth" = []))
)]
pub async fn get_top_sessions(
    State(state): State<SharedState>,
    Query(query): Query<RankingQuery>,
) -> Result<Json<TopSessionsResponse>> {
    let days = validate_days(query.days.unwrap_or(DEFAULT_TOP_SESSION_DAYS))?;
    let limit = validate_limit(
        query.limit.unwrap_or(DEFAULT_TOP_SESSION_LIMIT),
        MAX_TOP_SESSION_LIMIT,
    )?;
    let service = UsageMetricsService::new(state.db.clone());
    Ok(Json(service.get_top_sessions(days, limit).await?))
}

/// GET /api/metrics/users
#[utoipa::path(
    get,
    path = "/users",
    context_path = "/api/metrics",
    tag = "metrics",
    params(PageQuery),
    responses(
        (status = 200, description = "Paged per-user engagement", body = UserMetricsPage),
        (status = 400, description = "Invalid limit or offset", body = crate::api::openapi::ErrorResponse),
    ),
    security(("basic_auth" = []))
)]
pub async fn list_user_metrics(
    State(state): State<SharedState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<UserMetricsPage>> {
    let (limit, offset) = query.resolve(DEFAULT_USER_PAGE, MAX_USER_PAGE)?;
    let service = UsageMetricsService::new(state.db.clone());
    Ok(Json(service.get_user_metrics(limit, offset).await?))
}

/// GET /api/metrics/users/{user_id}
#[utoipa::path(
    get,
    path = "/users/{user_id}",
    context_path = "/api/metrics",
    tag = "metrics",
    params(("user_id" = String, Path, description = "User UUID")),
    responses(
        (status = 200, description = "User drill-down", body = UserDetail),
        (status = 400, description = "Malformed user id", body = crate::api::openapi::ErrorResponse),
        (status = 404, description = "User not found", body = crate::api::openapi::ErrorResponse),
    ),
    security(("basic_auth" = []))
)]
pub async fn get_user_detail(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserDetail>> {
    let user_id = parse_user_id(&user_id)?;
    let service = UsageMetricsService::new(state.db.clone());
    Ok(Json(service.get_user_detail(user_id).await?))
}

fn parse_user_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::Validation("Invalid user id".to_string()))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        get_kpis,
        get_trends,
        get_daily_minutes,
        get_top_sessions,
        list_user_metrics,
        get_user_detail,
    ),
    components(schemas(
        crate::services::usage_metrics_service::KpisResponse,
        crate::services::usage_metrics_service::PeriodCounts,
        crate::services::usage_metrics_service::PeriodMinutes,
        crate::services::usage_metrics_service::RecentCounts,
        crate::services::usage_metrics_service::ActiveUsers,
        crate::services::usage_metrics_service::TrendsResponse,
        crate::services::usage_metrics_service::TrendPoint,
        crate::services::usage_metrics_service::DailyMinutesResponse,
        crate::services::usage_metrics_service::DailyMinutesPoint,
        crate::services::usage_metrics_service::TopSessionsResponse,
        crate::services::usage_metrics_service::TopSession,
        crate::services::usage_metrics_service::UserMetricsPage,
        crate::services::usage_metrics_service::UserMetrics,
        crate::services::usage_metrics_service::UserDetail,
        crate::services::usage_metrics_service::UserProfile,
        crate::services::usage_metrics_service::UserSummary,
        crate::services::usage_metrics_service::UserTimeBased,
        crate::services::usage_metrics_service::PlaysAndMinutes,
        crate::services::usage_metrics_service::UserSessionStats,
        crate::services::usage_metrics_service::UserFavorite,
        crate::services::usage_metrics_service::UserFeedback,
        crate::services::usage_metrics_service::DailyActivityPoint,
    ))
)]
pub struct MetricsApiDoc;
