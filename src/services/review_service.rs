use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::job::status;
use crate::models::Review;

/// A review joined with the reviewer's public identity
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ReviewWithAuthor {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub customer_id: Uuid,
    pub job_id: Uuid,
    pub customer_name: String,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

pub struct ReviewService;

impl ReviewService {
    pub async fn list_for_provider(
        db: &Pool<Postgres>,
        provider_id: Uuid,
    ) -> AppResult<Vec<ReviewWithAuthor>> {
        let reviews = sqlx::query_as::<_, ReviewWithAuthor>(
            "SELECT r.id, r.provider_id, r.customer_id, r.job_id,
                    u.username AS customer_name,
                    r.rating, r.comment, r.created_at
             FROM reviews r
             JOIN users u ON u.id = r.customer_id
             WHERE r.provider_id = $1
             ORDER BY r.created_at DESC",
        )
        .bind(provider_id)
        .fetch_all(db)
        .await?;
        Ok(reviews)
    }

    /// One review per customer per provider per job, only after the job
    /// completed. Refreshes the provider's aggregate rating.
    pub async fn create(
        db: &Pool<Postgres>,
        provider_id: Uuid,
        customer_id: Uuid,
        job_id: Uuid,
        rating: i32,
        comment: &str,
    ) -> AppResult<Review> {
        if !(1..=5).contains(&rating) {
            return Err(AppError::BadRequest("rating must be between 1 and 5".into()));
        }

        let job: Option<(Uuid, Option<Uuid>, String)> =
            sqlx::query_as("SELECT customer_id, provider_id, status FROM jobs WHERE id = $1")
                .bind(job_id)
                .fetch_optional(db)
                .await?;
        let (job_customer, job_provider, job_status) = job.ok_or(AppError::NotFound)?;

        if job_customer != customer_id {
            return Err(AppError::Forbidden);
        }
        if job_provider != Some(provider_id) {
            return Err(AppError::BadRequest(
                "provider did not work this job".into(),
            ));
        }
        if job_status != status::COMPLETED {
            return Err(AppError::Conflict("job is not completed yet".into()));
        }

        let mut tx = db.begin().await?;

        let review = sqlx::query_as::<_, Review>(
            "INSERT INTO reviews (provider_id, customer_id, job_id, rating, comment)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING *",
        )
        .bind(provider_id)
        .bind(customer_id)
        .bind(job_id)
        .bind(rating)
        .bind(comment)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(dbe) if dbe.is_unique_violation() => {
                AppError::Conflict("you already reviewed this job".into())
            }
            _ => AppError::Database(e),
        })?;

        sqlx::query(
            "UPDATE service_providers
             SET rating = (SELECT ROUND(AVG(rating)::numeric, 2)::float8
                           FROM reviews WHERE provider_id = $1),
                 updated_at = now()
             WHERE id = $1",
        )
        .bind(provider_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(review)
    }
}
