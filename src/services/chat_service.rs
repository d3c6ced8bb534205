use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{chat::Conversation, chat::Message, User};

/// A message joined with its sender's identity, as returned by the history
/// endpoint
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MessageWithSender {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub sender: String,
    pub sender_first_name: String,
    pub sender_last_name: String,
    pub content: String,
    pub image_url: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

pub struct ChatService;

impl ChatService {
    pub async fn get_conversation(
        db: &Pool<Postgres>,
        id: Uuid,
    ) -> AppResult<Option<Conversation>> {
        let conversation = sqlx::query_as::<_, Conversation>(
            "SELECT id, job_id, customer_id, provider_id, created_at, updated_at
             FROM conversations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(conversation)
    }

    pub async fn get_user(db: &Pool<Postgres>, id: Uuid) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(db)
            .await?;
        Ok(user)
    }

    /// Create the conversation for a job once it permits messaging. Never
    /// recreates an existing one for the same job; returns the existing row
    /// instead.
    pub async fn create_conversation_for_job(
        db: &Pool<Postgres>,
        job_id: Uuid,
        customer_id: Uuid,
        provider_user_id: Uuid,
    ) -> AppResult<Conversation> {
        sqlx::query(
            "INSERT INTO conversations (job_id, customer_id, provider_id)
             VALUES ($1, $2, $3)
             ON CONFLICT (job_id) DO NOTHING",
        )
        .bind(job_id)
        .bind(customer_id)
        .bind(provider_user_id)
        .execute(db)
        .await?;

        let conversation = sqlx::query_as::<_, Conversation>(
            "SELECT id, job_id, customer_id, provider_id, created_at, updated_at
             FROM conversations WHERE job_id = $1",
        )
        .bind(job_id)
        .fetch_one(db)
        .await?;
        Ok(conversation)
    }

    /// Participant's conversations, most recently active first
    pub async fn list_conversations_for_user(
        db: &Pool<Postgres>,
        user_id: Uuid,
    ) -> AppResult<Vec<Conversation>> {
        let conversations = sqlx::query_as::<_, Conversation>(
            "SELECT id, job_id, customer_id, provider_id, created_at, updated_at
             FROM conversations
             WHERE customer_id = $1 OR provider_id = $1
             ORDER BY updated_at DESC",
        )
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(conversations)
    }

    /// Ordered history: creation time ascending, insertion order as tiebreak.
    /// History is the busiest read, so its pool acquisition is measured.
    pub async fn list_messages(
        db: &Pool<Postgres>,
        conversation_id: Uuid,
    ) -> AppResult<Vec<MessageWithSender>> {
        let mut conn = db_pool::acquire_with_metrics(db, crate::db::SERVICE_NAME).await?;
        let messages = sqlx::query_as::<_, MessageWithSender>(
            "SELECT m.id, m.conversation_id, m.sender_id,
                    u.username AS sender,
                    u.first_name AS sender_first_name,
                    u.last_name AS sender_last_name,
                    m.content, m.image_url, m.is_read, m.created_at
             FROM messages m
             JOIN users u ON u.id = m.sender_id
             WHERE m.conversation_id = $1
             ORDER BY m.created_at ASC, m.seq ASC",
        )
        .bind(conversation_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(messages)
    }

    /// Persist a new message and bump the conversation's activity timestamp
    pub async fn create_message(
        db: &Pool<Postgres>,
        conversation_id: Uuid,
        sender_id: Uuid,
        content: &str,
        image_url: Option<&str>,
    ) -> AppResult<Message> {
        let mut tx = db.begin().await?;

        let message = sqlx::query_as::<_, Message>(
            "INSERT INTO messages (conversation_id, sender_id, content, image_url)
             VALUES ($1, $2, $3, $4)
             RETURNING id, conversation_id, sender_id, content, image_url, is_read, seq, created_at",
        )
        .bind(conversation_id)
        .bind(sender_id)
        .bind(content)
        .bind(image_url.filter(|s| !s.is_empty()))
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE conversations SET updated_at = now() WHERE id = $1")
            .bind(conversation_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(message)
    }

    /// Mark every unread message not sent by the reader as read, and ensure a
    /// read-status row exists for each. Atomic per message; idempotent under
    /// concurrent retries via the unique (message, reader) constraint.
    pub async fn mark_messages_read(
        db: &Pool<Postgres>,
        conversation_id: Uuid,
        reader_id: Uuid,
    ) -> AppResult<u64> {
        let unread_ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT id FROM messages
             WHERE conversation_id = $1 AND is_read = FALSE AND sender_id <> $2
             ORDER BY created_at ASC, seq ASC",
        )
        .bind(conversation_id)
        .bind(reader_id)
        .fetch_all(db)
        .await?;

        let mut marked = 0u64;
        for message_id in unread_ids {
            let mut tx = db.begin().await?;
            sqlx::query("UPDATE messages SET is_read = TRUE WHERE id = $1")
                .bind(message_id)
                .execute(&mut *tx)
                .await?;
            sqlx::query(
                "INSERT INTO message_read_statuses (message_id, user_id)
                 VALUES ($1, $2)
                 ON CONFLICT (message_id, user_id) DO NOTHING",
            )
            .bind(message_id)
            .bind(reader_id)
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;
            marked += 1;
        }
        Ok(marked)
    }
}
