use sqlx::{Pool, Postgres};
use tracing::warn;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::Notification;
use crate::state::AppState;
use crate::websocket::{broadcast_json, events::UserOutbound, user_group};

pub struct NotificationService;

impl NotificationService {
    /// Persist a notification and push it into the recipient's group.
    /// Fail-soft: producers never fail their own flow over a notification.
    pub async fn notify(
        state: &AppState,
        user_id: Uuid,
        title: &str,
        body: &str,
        kind: &str,
        data: serde_json::Value,
    ) {
        let notification = match Self::create(&state.db, user_id, title, body, kind, data).await {
            Ok(notification) => notification,
            Err(e) => {
                warn!(%user_id, kind, error = %e, "failed to persist notification");
                return;
            }
        };

        let event = UserOutbound::Notification {
            title: notification.title.clone(),
            message: notification.body.clone(),
            notification_type: notification.kind.clone(),
            data: notification.data.clone(),
            timestamp: notification.created_at,
        };
        broadcast_json(state, &user_group(user_id), &event).await;
    }

    pub async fn create(
        db: &Pool<Postgres>,
        user_id: Uuid,
        title: &str,
        body: &str,
        kind: &str,
        data: serde_json::Value,
    ) -> AppResult<Notification> {
        let notification = sqlx::query_as::<_, Notification>(
            "INSERT INTO notifications (user_id, title, body, kind, data)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, user_id, title, body, kind, data, is_read, created_at",
        )
        .bind(user_id)
        .bind(title)
        .bind(body)
        .bind(kind)
        .bind(data)
        .fetch_one(db)
        .await?;
        Ok(notification)
    }

    pub async fn list(
        db: &Pool<Postgres>,
        user_id: Uuid,
        unread_only: bool,
    ) -> AppResult<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(
            "SELECT id, user_id, title, body, kind, data, is_read, created_at
             FROM notifications
             WHERE user_id = $1 AND (NOT $2 OR is_read = FALSE)
             ORDER BY created_at DESC",
        )
        .bind(user_id)
        .bind(unread_only)
        .fetch_all(db)
        .await?;
        Ok(notifications)
    }

    pub async fn mark_read(
        db: &Pool<Postgres>,
        user_id: Uuid,
        notification_id: Uuid,
    ) -> AppResult<Notification> {
        sqlx::query_as::<_, Notification>(
            "UPDATE notifications SET is_read = TRUE
             WHERE id = $1 AND user_id = $2
             RETURNING id, user_id, title, body, kind, data, is_read, created_at",
        )
        .bind(notification_id)
        .bind(user_id)
        .fetch_optional(db)
        .await?
        .ok_or(AppError::NotFound)
    }

    pub async fn mark_all_read(db: &Pool<Postgres>, user_id: Uuid) -> AppResult<u64> {
        let result =
            sqlx::query("UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND is_read = FALSE")
                .bind(user_id)
                .execute(db)
                .await?;
        Ok(result.rows_affected())
    }
}
