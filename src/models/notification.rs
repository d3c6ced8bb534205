use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub body: String,
    pub kind: String,
    pub data: serde_json::Value,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Notification categories produced by the marketplace flows
pub mod kinds {
    pub const JOB_APPLICATION: &str = "job_application";
    pub const APPLICATION_RESPONSE: &str = "application_response";
    pub const JOB_STATUS: &str = "job_status";
    pub const JOB_UPDATE: &str = "job_update";
    pub const NEW_REVIEW: &str = "new_review";
    pub const NEW_MESSAGE: &str = "new_message";
}
