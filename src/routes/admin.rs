use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::guards::{AdminUser, CurrentUser};
use crate::models::User;
use crate::state::AppState;

pub async fn verify(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<serde_json::Value>> {
    let admin = AdminUser::verify(&state.db, current.id).await?;
    Ok(Json(json!({ "is_admin": true, "user_id": admin.id })))
}

async fn count(db: &Pool<Postgres>, sql: &str) -> AppResult<i64> {
    Ok(sqlx::query_scalar(sql).fetch_one(db).await?)
}

pub async fn stats(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<serde_json::Value>> {
    AdminUser::verify(&state.db, current.id).await?;
    let db = &state.db;

    let users = count(db, "SELECT COUNT(*) FROM users").await?;
    let customers = count(db, "SELECT COUNT(*) FROM users WHERE role = 'customer'").await?;
    let providers = count(db, "SELECT COUNT(*) FROM users WHERE role = 'provider'").await?;
    let jobs = count(db, "SELECT COUNT(*) FROM jobs").await?;
    let pending_jobs = count(db, "SELECT COUNT(*) FROM jobs WHERE status = 'pending'").await?;
    let completed_jobs = count(db, "SELECT COUNT(*) FROM jobs WHERE status = 'completed'").await?;
    let applications = count(db, "SELECT COUNT(*) FROM job_applications").await?;
    let reviews = count(db, "SELECT COUNT(*) FROM reviews").await?;
    let conversations = count(db, "SELECT COUNT(*) FROM conversations").await?;
    let messages = count(db, "SELECT COUNT(*) FROM messages").await?;

    Ok(Json(json!({
        "users": { "total": users, "customers": customers, "providers": providers },
        "jobs": { "total": jobs, "pending": pending_jobs, "completed": completed_jobs },
        "applications": applications,
        "reviews": reviews,
        "chat": { "conversations": conversations, "messages": messages },
    })))
}

#[derive(Debug, Serialize, sqlx::FromRow)]
struct RecentUser {
    id: Uuid,
    username: String,
    role: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
struct RecentJob {
    id: Uuid,
    title: String,
    status: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
struct RecentReview {
    id: Uuid,
    provider_id: Uuid,
    rating: i32,
    created_at: DateTime<Utc>,
}

pub async fn activity(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<serde_json::Value>> {
    AdminUser::verify(&state.db, current.id).await?;

    let users = sqlx::query_as::<_, RecentUser>(
        "SELECT id, username, role, created_at FROM users ORDER BY created_at DESC LIMIT 10",
    )
    .fetch_all(&state.db)
    .await?;
    let jobs = sqlx::query_as::<_, RecentJob>(
        "SELECT id, title, status, created_at FROM jobs ORDER BY created_at DESC LIMIT 10",
    )
    .fetch_all(&state.db)
    .await?;
    let reviews = sqlx::query_as::<_, RecentReview>(
        "SELECT id, provider_id, rating, created_at FROM reviews ORDER BY created_at DESC LIMIT 10",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(json!({
        "recent_users": users,
        "recent_jobs": jobs,
        "recent_reviews": reviews,
    })))
}

/// Liveness of the service's dependencies. Probes are independent; one
/// degraded dependency does not hide the state of the others.
pub async fn status(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<serde_json::Value>> {
    AdminUser::verify(&state.db, current.id).await?;

    // goes through the metered acquire so a starved pool shows up in the
    // acquisition counters as well as in this probe
    let database = match db_pool::acquire_with_metrics(&state.db, crate::db::SERVICE_NAME).await {
        Ok(mut conn) => sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&mut *conn)
            .await
            .is_ok(),
        Err(_) => false,
    };

    let redis = match state.redis.get_multiplexed_async_connection().await {
        Ok(mut conn) => redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .is_ok(),
        Err(_) => false,
    };

    let bus_groups = state.bus.group_count().await;

    Ok(Json(json!({
        "database": if database { "up" } else { "down" },
        "redis": if redis { "up" } else { "down" },
        "bus": { "groups": bus_groups },
        "instance_id": state.instance_id,
    })))
}

pub async fn list_users(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<Vec<User>>> {
    AdminUser::verify(&state.db, current.id).await?;
    let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at DESC")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(users))
}

pub async fn verify_user(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<User>> {
    AdminUser::verify(&state.db, current.id).await?;
    let user = sqlx::query_as::<_, User>(
        "UPDATE users SET is_verified = TRUE, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(user_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or(crate::error::AppError::NotFound)?;
    Ok(Json(user))
}
