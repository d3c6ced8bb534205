use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod status {
    pub const PENDING: &str = "pending";
    pub const ACCEPTED: &str = "accepted";
    pub const IN_PROGRESS: &str = "in_progress";
    pub const COMPLETED: &str = "completed";
    pub const CANCELLED: &str = "cancelled";

    pub fn is_valid(status: &str) -> bool {
        matches!(status, PENDING | ACCEPTED | IN_PROGRESS | COMPLETED | CANCELLED)
    }

    pub fn is_terminal(status: &str) -> bool {
        matches!(status, COMPLETED | CANCELLED)
    }

    /// Allowed forward transitions. Cancellation is allowed from any
    /// pre-terminal state. `accepted` is never a direct target: a job
    /// becomes accepted only when the customer accepts an application,
    /// which also assigns the provider.
    pub fn can_transition(from: &str, to: &str) -> bool {
        match (from, to) {
            (ACCEPTED, IN_PROGRESS) => true,
            (IN_PROGRESS, COMPLETED) => true,
            (f, CANCELLED) if !is_terminal(f) => true,
            _ => false,
        }
    }
}

pub mod urgency {
    pub const NORMAL: &str = "normal";
    pub const URGENT: &str = "urgent";

    pub fn is_valid(value: &str) -> bool {
        matches!(value, NORMAL | URGENT)
    }
}

pub mod preferred_time {
    pub const MORNING: &str = "morning";
    pub const AFTERNOON: &str = "afternoon";
    pub const EVENING: &str = "evening";

    pub fn is_valid(value: &str) -> bool {
        matches!(value, MORNING | AFTERNOON | EVENING)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Job {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub provider_id: Option<Uuid>,
    pub category_id: Uuid,
    pub title: String,
    pub description: String,
    pub address: String,
    pub preferred_date: NaiveDate,
    pub preferred_time: String,
    pub urgency: String,
    pub status: String,
    pub estimated_price_cents: Option<i64>,
    pub final_price_cents: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

pub mod application_status {
    pub const PENDING: &str = "pending";
    pub const ACCEPTED: &str = "accepted";
    pub const REJECTED: &str = "rejected";
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct JobApplication {
    pub id: Uuid,
    pub job_id: Uuid,
    pub provider_id: Uuid,
    pub message: String,
    pub proposed_price_cents: Option<i64>,
    pub estimated_duration: Option<String>,
    pub status: String,
    pub applied_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct JobUpdate {
    pub id: Uuid,
    pub job_id: Uuid,
    pub user_id: Uuid,
    pub message: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_moves_forward_only() {
        assert!(status::can_transition(status::ACCEPTED, status::IN_PROGRESS));
        assert!(status::can_transition(status::IN_PROGRESS, status::COMPLETED));

        assert!(!status::can_transition(status::COMPLETED, status::IN_PROGRESS));
        assert!(!status::can_transition(status::PENDING, status::COMPLETED));
        assert!(!status::can_transition(status::ACCEPTED, status::PENDING));
    }

    #[test]
    fn acceptance_only_happens_through_an_application_response() {
        // a pending job cannot be flipped to accepted by the status
        // endpoint; that would leave it with no assigned provider
        assert!(!status::can_transition(status::PENDING, status::ACCEPTED));
        assert!(!status::can_transition(status::IN_PROGRESS, status::ACCEPTED));
    }

    #[test]
    fn cancel_is_allowed_from_pre_terminal_states_only() {
        assert!(status::can_transition(status::PENDING, status::CANCELLED));
        assert!(status::can_transition(status::ACCEPTED, status::CANCELLED));
        assert!(status::can_transition(status::IN_PROGRESS, status::CANCELLED));

        assert!(!status::can_transition(status::COMPLETED, status::CANCELLED));
        assert!(!status::can_transition(status::CANCELLED, status::CANCELLED));
    }

    #[test]
    fn status_vocabulary_is_closed() {
        assert!(status::is_valid("pending"));
        assert!(status::is_valid("in_progress"));
        // "open" was never part of the status vocabulary
        assert!(!status::is_valid("open"));
    }
}
