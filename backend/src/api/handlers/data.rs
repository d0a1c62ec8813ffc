//! Data browser API handlers (`/api/data`, session cookie).

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use utoipa::OpenApi;

use crate::api::dto::PageQuery;
use crate::api::SharedState;
use crate::error::Result;
use crate::models::favorite::Favorite;
use crate::models::feedback::Feedback;
use crate::models::play_history::PlayRecord;
use crate::models::unified_session::UnifiedSession;
use crate::models::user::AppUser;
use crate::services::usage_data_service::{DataPage, DataSummary, DataTable, UsageDataService};

const DEFAULT_PAGE: i64 = 100;
const MAX_PAGE: i64 = 1000;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/summary", get(get_summary))
        .route("/users", get(list_users))
        .route("/play-history", get(list_play_history))
        .route("/sessions", get(list_sessions))
        .route("/favorites", get(list_favorites))
        .route("/feedback", get(list_feedback))
}

/// GET /api/data/summary
#[utoipa::path(
    get,
    path = "/summary",
    context_path = "/api/data",
    tag = "data",
    responses(
        (status = 200, description = "Row counts per table", body = DataSummary),
        (status = 401, description = "Not authenticated", body = crate::api::openapi::ErrorResponse),
    ),
    security(("session_cookie" = []))
)]
pub async fn get_summary(State(state): State<SharedState>) -> Result<Json<DataSummary>> {
    let service = UsageDataService::new(state.db.clone());
    Ok(Json(service.summary().await?))
}

/// GET /api/data/users
#[utoipa::path(
    get,
    path = "/users",
    context_path = "/api/data",
    tag = "data",
    params(PageQuery),
    responses((status = 200, description = "Users, newest first", body = DataPage<AppUser>)),
    security(("session_cookie" = []))
)]
pub async fn list_users(
    State(state): State<SharedState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<DataPage<AppUser>>> {
    list_table(&state, DataTable::Users, &query).await
}

/// GET /api/data/play-history
#[utoipa::path(
    get,
    path = "/play-history",
    context_path = "/api/data",
    tag = "data",
    params(PageQuery),
    responses((status = 200, description = "Play records, newest first", body = DataPage<PlayRecord>)),
    security(("session_cookie" = []))
)]
pub async fn list_play_history(
    State(state): State<SharedState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<DataPage<PlayRecord>>> {
    list_table(&state, DataTable::PlayHistory, &query).await
}

/// GET /api/data/sessions
#[utoipa::path(
    get,
    path = "/sessions",
    context_path = "/api/data",
    tag = "data",
    params(PageQuery),
    responses((status = 200, description = "Content sessions, newest first", body = DataPage<UnifiedSession>)),
    security(("session_cookie" = []))
)]
pub async fn list_sessions(
    State(state): State<SharedState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<DataPage<UnifiedSession>>> {
    list_table(&state, DataTable::Sessions, &query).await
}

/// GET /api/data/favorites
#[utoipa::path(
    get,
    path = "/favorites",
    context_path = "/api/data",
    tag = "data",
    params(PageQuery),
    responses((status = 200, description = "Favorites, newest first", body = DataPage<Favorite>)),
    security(("session_cookie" = []))
)]
pub async fn list_favorites(
    State(state): State<SharedState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<DataPage<Favorite>>> {
    list_table(&state, DataTable::Favorites, &query).await
}

/// GET /api/data/feedback
#[utoipa::path(
    get,
    path = "/feedback",
    context_path = "/api/data",
    tag = "data",
    params(PageQuery),
    responses((status = 200, description = "Feedback, newest first", body = DataPage<Feedback>)),
    security(("session_cookie" = []))
)]
pub async fn list_feedback(
    State(state): State<SharedState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<DataPage<Feedback>>> {
    list_table(&state, DataTable::Feedback, &query).await
}

async fn list_table<T>(
    state: &SharedState,
    table: DataTable,
    query: &PageQuery,
) -> Result<Json<DataPage<T>>>
where
    T: for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
{
    let (limit, offset) = query.resolve(DEFAULT_PAGE, MAX_PAGE)?;
    let service = UsageDataService::new(state.db.clone());
    Ok(Json(service.list(table, limit, offset).await?))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        get_summary,
        list_users,
        list_play_history,
        list_sessions,
        list_favorites,
        list_feedback,
    ),
    components(schemas(
        DataSummary,
        AppUser,
        PlayRecord,
        UnifiedSession,
        Favorite,
        Feedback,
    ))
)]
pub struct DataApiDoc;
