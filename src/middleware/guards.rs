//! Authorization guards that enforce permission checks at the type level
//! This prevents handlers from accidentally bypassing authorization

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;

/// Represents an authenticated user extracted from JWT claims
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Set by the auth middleware after token validation
        let user_id = parts
            .extensions
            .get::<Uuid>()
            .cloned()
            .ok_or(AppError::Unauthorized)?;

        Ok(CurrentUser { id: user_id })
    }
}

/// A user confirmed to hold the admin role
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub id: Uuid,
}

impl AdminUser {
    /// Factory method performing one database query to confirm the role
    pub async fn verify(db: &PgPool, user_id: Uuid) -> Result<Self, AppError> {
        let role: Option<String> =
            sqlx::query_scalar("SELECT role FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(db)
                .await?;

        match role.as_deref() {
            Some("admin") => Ok(AdminUser { id: user_id }),
            Some(_) => Err(AppError::Forbidden),
            None => Err(AppError::Unauthorized),
        }
    }
}

/// A verified participant of one conversation, with both party ids resolved
#[derive(Debug, Clone)]
pub struct ChatParticipant {
    pub user_id: Uuid,
    pub conversation_id: Uuid,
    pub job_id: Uuid,
    pub customer_id: Uuid,
    pub provider_id: Uuid,
}

impl ChatParticipant {
    /// Factory method to verify conversation membership with one lookup.
    /// A missing conversation and a third-party identity are both rejections.
    pub async fn verify(
        db: &PgPool,
        user_id: Uuid,
        conversation_id: Uuid,
    ) -> Result<Self, AppError> {
        let row = sqlx::query_as::<_, ConversationPartiesRecord>(
            "SELECT id, job_id, customer_id, provider_id FROM conversations WHERE id = $1",
        )
        .bind(conversation_id)
        .fetch_optional(db)
        .await?
        .ok_or(AppError::Forbidden)?;

        if row.customer_id != user_id && row.provider_id != user_id {
            return Err(AppError::Forbidden);
        }

        Ok(ChatParticipant {
            user_id,
            conversation_id: row.id,
            job_id: row.job_id,
            customer_id: row.customer_id,
            provider_id: row.provider_id,
        })
    }

    /// The other party of the conversation
    pub fn counterpart_id(&self) -> Uuid {
        if self.user_id == self.customer_id {
            self.provider_id
        } else {
            self.customer_id
        }
    }
}

#[derive(sqlx::FromRow)]
struct ConversationPartiesRecord {
    id: Uuid,
    job_id: Uuid,
    customer_id: Uuid,
    provider_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn participant(user_is_customer: bool) -> ChatParticipant {
        let customer_id = Uuid::new_v4();
        let provider_id = Uuid::new_v4();
        ChatParticipant {
            user_id: if user_is_customer {
                customer_id
            } else {
                provider_id
            },
            conversation_id: Uuid::new_v4(),
            job_id: Uuid::new_v4(),
            customer_id,
            provider_id,
        }
    }

    #[test]
    fn counterpart_of_customer_is_provider() {
        let p = participant(true);
        assert_eq!(p.counterpart_id(), p.provider_id);
    }

    #[test]
    fn counterpart_of_provider_is_customer() {
        let p = participant(false);
        assert_eq!(p.counterpart_id(), p.customer_id);
    }
}
