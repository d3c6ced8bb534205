use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod roles {
    pub const CUSTOMER: &str = "customer";
    pub const PROVIDER: &str = "provider";
    pub const ADMIN: &str = "admin";

    pub fn is_valid(role: &str) -> bool {
        matches!(role, CUSTOMER | PROVIDER | ADMIN)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// "first last" trimmed, falling back to the username when both are blank
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }

    pub fn is_customer(&self) -> bool {
        self.role == roles::CUSTOMER
    }

    pub fn is_provider(&self) -> bool {
        self.role == roles::PROVIDER
    }

    pub fn is_admin(&self) -> bool {
        self.role == roles::ADMIN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(first: &str, last: &str) -> User {
        User {
            id: Uuid::new_v4(),
            username: "handy_dan".into(),
            email: "dan@example.com".into(),
            password_hash: String::new(),
            first_name: first.into(),
            last_name: last.into(),
            role: roles::PROVIDER.into(),
            phone_number: None,
            address: None,
            is_verified: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn display_name_joins_first_and_last() {
        assert_eq!(user("Dan", "Harper").display_name(), "Dan Harper");
    }

    #[test]
    fn display_name_trims_partial_names() {
        assert_eq!(user("Dan", "").display_name(), "Dan");
        assert_eq!(user("", "Harper").display_name(), "Harper");
    }

    #[test]
    fn display_name_falls_back_to_username() {
        assert_eq!(user("", "").display_name(), "handy_dan");
    }

    #[test]
    fn role_vocabulary_is_closed() {
        assert!(roles::is_valid("customer"));
        assert!(roles::is_valid("provider"));
        assert!(roles::is_valid("admin"));
        assert!(!roles::is_valid("superuser"));
    }
}
