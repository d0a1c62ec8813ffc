//! Test fixtures and data factories for backend tests
//!
//! Every helper inserts fresh rows keyed by new UUIDs, so tests can share a
//! database without stepping on each other.

#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Timestamp `days` days and `hours` hours before now.
pub fn ago(days: i64, hours: i64) -> DateTime<Utc> {
    Utc::now() - Duration::days(days) - Duration::hours(hours)
}

/// Unique email for a seeded user.
pub fn test_email() -> String {
    format!("user_{}@test.local", Uuid::new_v4().simple())
}

pub async fn insert_user(
    pool: &PgPool,
    email: Option<&str>,
    created_at: DateTime<Utc>,
) -> Uuid {
    sqlx::query_scalar(
        "INSERT INTO users (email, email_confirmed_at, created_at) VALUES ($1, $2, $2) RETURNING id",
    )
    .bind(email)
    .bind(created_at)
    .fetch_one(pool)
    .await
    .expect("Failed to insert user")
}

/// Insert a playable session of `length_secs` seconds.
pub async fn insert_session(pool: &PgPool, title: &str, length_secs: i32) -> Uuid {
    sqlx::query_scalar(
        r#"
        INSERT INTO unified_sessions (title, audio_url, session_type, length, tag)
        VALUES ($1, $2, 'session', $3, 'test')
        RETURNING id
        "#,
    )
    .bind(title)
    .bind(format!("https://cdn.test.local/{}.mp3", Uuid::new_v4().simple()))
    .bind(length_secs)
    .fetch_one(pool)
    .await
    .expect("Failed to insert session")
}

pub async fn insert_play(
    pool: &PgPool,
    user_id: Uuid,
    session_id: Option<Uuid>,
    status: &str,
    progress: Option<f64>,
    created_at: DateTime<Utc>,
) -> Uuid {
    sqlx::query_scalar(
        r#"
        INSERT INTO user_play_history (user_id, session_id, status, progress_percentage, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $5)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(session_id)
    .bind(status)
    .bind(progress)
    .bind(created_at)
    .fetch_one(pool)
    .await
    .expect("Failed to insert play")
}

pub async fn insert_favorite(
    pool: &PgPool,
    user_id: Uuid,
    session_id: Uuid,
    created_at: DateTime<Utc>,
) {
    sqlx::query("INSERT INTO favorites (user_id, session_id, created_at) VALUES ($1, $2, $3)")
        .bind(user_id)
        .bind(session_id)
        .bind(created_at)
        .execute(pool)
        .await
        .expect("Failed to insert favorite");
}

pub async fn insert_feedback(
    pool: &PgPool,
    user_id: Uuid,
    message: &str,
    created_at: DateTime<Utc>,
) {
    sqlx::query(
        r#"
        INSERT INTO feedback (user_id, message, app_version, device_info, created_at)
        VALUES ($1, $2, '1.4.0', 'iPhone 15', $3)
        "#,
    )
    .bind(user_id)
    .bind(message)
    .bind(created_at)
    .execute(pool)
    .await
    .expect("Failed to insert feedback");
}
