use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::guards::CurrentUser;
use crate::models::Notification;
use crate::services::notification_service::NotificationService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NotificationFilter {
    #[serde(default)]
    pub unread: bool,
}

pub async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(filter): Query<NotificationFilter>,
) -> AppResult<Json<Vec<Notification>>> {
    let notifications =
        NotificationService::list(&state.db, current.id, filter.unread).await?;
    Ok(Json(notifications))
}

pub async fn mark_read(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(notification_id): Path<Uuid>,
) -> AppResult<Json<Notification>> {
    let notification =
        NotificationService::mark_read(&state.db, current.id, notification_id).await?;
    Ok(Json(notification))
}

pub async fn read_all(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<serde_json::Value>> {
    let updated = NotificationService::mark_all_read(&state.db, current.id).await?;
    Ok(Json(json!({ "updated": updated })))
}
