use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ServiceCategory {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ServiceProvider {
    pub id: Uuid,
    pub user_id: Uuid,
    pub business_name: String,
    pub description: String,
    pub skills: String,
    pub experience_years: i32,
    pub hourly_rate_cents: Option<i64>,
    pub service_area: String,
    pub license_number: Option<String>,
    pub insurance_verified: bool,
    pub is_available: bool,
    pub rating: f64,
    pub total_jobs: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub mod days {
    pub const ALL: [&str; 7] = [
        "monday",
        "tuesday",
        "wednesday",
        "thursday",
        "friday",
        "saturday",
        "sunday",
    ];

    pub fn is_valid(day: &str) -> bool {
        ALL.contains(&day)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProviderAvailability {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub day_of_week: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_available: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_vocabulary_is_closed() {
        for day in days::ALL {
            assert!(days::is_valid(day));
        }
        assert!(!days::is_valid("someday"));
    }
}
