use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::chat::Conversation;
use crate::models::job::{preferred_time, status, urgency, Job, JobApplication, JobUpdate};
use crate::models::User;

pub struct NewJob<'a> {
    pub category_id: Uuid,
    pub title: &'a str,
    pub description: &'a str,
    pub address: &'a str,
    pub preferred_date: NaiveDate,
    pub preferred_time: &'a str,
    pub urgency: &'a str,
    pub estimated_price_cents: Option<i64>,
}

pub struct NewApplication<'a> {
    pub message: &'a str,
    pub proposed_price_cents: Option<i64>,
    pub estimated_duration: Option<&'a str>,
}

/// An application joined with the applying provider's public identity
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ApplicationWithProvider {
    pub id: Uuid,
    pub job_id: Uuid,
    pub provider_id: Uuid,
    pub business_name: String,
    pub username: String,
    pub rating: f64,
    pub message: String,
    pub proposed_price_cents: Option<i64>,
    pub estimated_duration: Option<String>,
    pub status: String,
    pub applied_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

pub struct RespondOutcome {
    pub application: JobApplication,
    pub job: Job,
    pub provider_user_id: Uuid,
    pub conversation: Option<Conversation>,
}

pub struct JobService;

impl JobService {
    pub async fn create_job(
        db: &Pool<Postgres>,
        customer: &User,
        new_job: NewJob<'_>,
    ) -> AppResult<Job> {
        if !customer.is_customer() {
            return Err(AppError::Forbidden);
        }
        if new_job.title.trim().is_empty() || new_job.description.trim().is_empty() {
            return Err(AppError::BadRequest("title and description are required".into()));
        }
        if !preferred_time::is_valid(new_job.preferred_time) {
            return Err(AppError::BadRequest(
                "preferred_time must be morning, afternoon or evening".into(),
            ));
        }
        if !urgency::is_valid(new_job.urgency) {
            return Err(AppError::BadRequest("urgency must be normal or urgent".into()));
        }

        let job = sqlx::query_as::<_, Job>(
            "INSERT INTO jobs
                 (customer_id, category_id, title, description, address,
                  preferred_date, preferred_time, urgency, estimated_price_cents)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING *",
        )
        .bind(customer.id)
        .bind(new_job.category_id)
        .bind(new_job.title)
        .bind(new_job.description)
        .bind(new_job.address)
        .bind(new_job.preferred_date)
        .bind(new_job.preferred_time)
        .bind(new_job.urgency)
        .bind(new_job.estimated_price_cents)
        .fetch_one(db)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(dbe) if dbe.is_foreign_key_violation() => {
                AppError::BadRequest("unknown category".into())
            }
            _ => AppError::Database(e),
        })?;
        Ok(job)
    }

    /// Role-scoped listing: customers see their own jobs; providers see
    /// pending jobs (open for applications) plus jobs assigned to them;
    /// admins see everything.
    pub async fn list_jobs(db: &Pool<Postgres>, user: &User) -> AppResult<Vec<Job>> {
        let jobs = if user.is_admin() {
            sqlx::query_as::<_, Job>("SELECT * FROM jobs ORDER BY created_at DESC")
                .fetch_all(db)
                .await?
        } else if user.is_provider() {
            sqlx::query_as::<_, Job>(
                "SELECT j.* FROM jobs j
                 LEFT JOIN service_providers p ON p.id = j.provider_id
                 WHERE j.status = $1 OR p.user_id = $2
                 ORDER BY j.created_at DESC",
            )
            .bind(status::PENDING)
            .bind(user.id)
            .fetch_all(db)
            .await?
        } else {
            sqlx::query_as::<_, Job>(
                "SELECT * FROM jobs WHERE customer_id = $1 ORDER BY created_at DESC",
            )
            .bind(user.id)
            .fetch_all(db)
            .await?
        };
        Ok(jobs)
    }

    pub async fn get_job(db: &Pool<Postgres>, id: Uuid) -> AppResult<Job> {
        sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Visibility check matching `list_jobs` scoping
    pub async fn get_job_visible(db: &Pool<Postgres>, user: &User, id: Uuid) -> AppResult<Job> {
        let job = Self::get_job(db, id).await?;
        if user.is_admin() || job.customer_id == user.id {
            return Ok(job);
        }
        if user.is_provider() {
            if job.status == status::PENDING {
                return Ok(job);
            }
            if let Some(provider_id) = job.provider_id {
                let owner: Option<Uuid> =
                    sqlx::query_scalar("SELECT user_id FROM service_providers WHERE id = $1")
                        .bind(provider_id)
                        .fetch_optional(db)
                        .await?;
                if owner == Some(user.id) {
                    return Ok(job);
                }
            }
        }
        Err(AppError::NotFound)
    }

    pub async fn apply(
        db: &Pool<Postgres>,
        job_id: Uuid,
        provider_id: Uuid,
        application: NewApplication<'_>,
    ) -> AppResult<(JobApplication, Job)> {
        let job = Self::get_job(db, job_id).await?;
        if job.status != status::PENDING {
            return Err(AppError::Conflict("job is no longer open for applications".into()));
        }

        let application = sqlx::query_as::<_, JobApplication>(
            "INSERT INTO job_applications
                 (job_id, provider_id, message, proposed_price_cents, estimated_duration)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING *",
        )
        .bind(job_id)
        .bind(provider_id)
        .bind(application.message)
        .bind(application.proposed_price_cents)
        .bind(application.estimated_duration)
        .fetch_one(db)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(dbe) if dbe.is_unique_violation() => {
                AppError::Conflict("already applied to this job".into())
            }
            _ => AppError::Database(e),
        })?;

        Ok((application, job))
    }

    pub async fn list_applications(
        db: &Pool<Postgres>,
        job_id: Uuid,
    ) -> AppResult<Vec<ApplicationWithProvider>> {
        let applications = sqlx::query_as::<_, ApplicationWithProvider>(
            "SELECT a.id, a.job_id, a.provider_id, p.business_name, u.username, p.rating,
                    a.message, a.proposed_price_cents, a.estimated_duration,
                    a.status, a.applied_at, a.responded_at
             FROM job_applications a
             JOIN service_providers p ON p.id = a.provider_id
             JOIN users u ON u.id = p.user_id
             WHERE a.job_id = $1
             ORDER BY a.applied_at ASC",
        )
        .bind(job_id)
        .fetch_all(db)
        .await?;
        Ok(applications)
    }

    /// Accept or reject one application. Accepting assigns the provider,
    /// moves the job to accepted, rejects competing applications and creates
    /// the conversation idempotently.
    pub async fn respond(
        db: &Pool<Postgres>,
        application_id: Uuid,
        customer_id: Uuid,
        accept: bool,
    ) -> AppResult<RespondOutcome> {
        let mut tx = db.begin().await?;

        let application = sqlx::query_as::<_, JobApplication>(
            "SELECT * FROM job_applications WHERE id = $1 FOR UPDATE",
        )
        .bind(application_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound)?;

        let job = sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1 FOR UPDATE")
            .bind(application.job_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::NotFound)?;

        if job.customer_id != customer_id {
            return Err(AppError::Forbidden);
        }
        if application.status != crate::models::job::application_status::PENDING {
            return Err(AppError::Conflict("application already responded to".into()));
        }

        let provider_user_id: Uuid =
            sqlx::query_scalar("SELECT user_id FROM service_providers WHERE id = $1")
                .bind(application.provider_id)
                .fetch_one(&mut *tx)
                .await?;

        if !accept {
            let application = sqlx::query_as::<_, JobApplication>(
                "UPDATE job_applications SET status = 'rejected', responded_at = now()
                 WHERE id = $1 RETURNING *",
            )
            .bind(application_id)
            .fetch_one(&mut *tx)
            .await?;
            tx.commit().await?;
            return Ok(RespondOutcome {
                application,
                job,
                provider_user_id,
                conversation: None,
            });
        }

        if job.status != status::PENDING {
            return Err(AppError::Conflict("job already has an assigned provider".into()));
        }

        let application = sqlx::query_as::<_, JobApplication>(
            "UPDATE job_applications SET status = 'accepted', responded_at = now()
             WHERE id = $1 RETURNING *",
        )
        .bind(application_id)
        .fetch_one(&mut *tx)
        .await?;

        // competing applications lose
        sqlx::query(
            "UPDATE job_applications SET status = 'rejected', responded_at = now()
             WHERE job_id = $1 AND id <> $2 AND status = 'pending'",
        )
        .bind(job.id)
        .bind(application_id)
        .execute(&mut *tx)
        .await?;

        let job = sqlx::query_as::<_, Job>(
            "UPDATE jobs SET provider_id = $2, status = 'accepted',
                             accepted_at = now(), updated_at = now()
             WHERE id = $1 RETURNING *",
        )
        .bind(job.id)
        .bind(application.provider_id)
        .fetch_one(&mut *tx)
        .await?;

        // messaging opens once, never a second conversation for the job
        sqlx::query(
            "INSERT INTO conversations (job_id, customer_id, provider_id)
             VALUES ($1, $2, $3)
             ON CONFLICT (job_id) DO NOTHING",
        )
        .bind(job.id)
        .bind(job.customer_id)
        .bind(provider_user_id)
        .execute(&mut *tx)
        .await?;

        let conversation = sqlx::query_as::<_, Conversation>(
            "SELECT id, job_id, customer_id, provider_id, created_at, updated_at
             FROM conversations WHERE job_id = $1",
        )
        .bind(job.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(RespondOutcome {
            application,
            job,
            provider_user_id,
            conversation: Some(conversation),
        })
    }

    /// Resolve the user id of a job's assigned provider, if any
    pub async fn assigned_provider_user(
        db: &Pool<Postgres>,
        job: &Job,
    ) -> AppResult<Option<Uuid>> {
        let Some(provider_id) = job.provider_id else {
            return Ok(None);
        };
        let owner: Option<Uuid> =
            sqlx::query_scalar("SELECT user_id FROM service_providers WHERE id = $1")
                .bind(provider_id)
                .fetch_optional(db)
                .await?;
        Ok(owner)
    }

    /// Lifecycle transition by the customer or the assigned provider.
    /// Returns the updated job and the counterpart user to notify.
    pub async fn update_status(
        db: &Pool<Postgres>,
        job_id: Uuid,
        actor: &User,
        new_status: &str,
    ) -> AppResult<(Job, Option<Uuid>)> {
        if !status::is_valid(new_status) {
            return Err(AppError::BadRequest(format!("unknown status: {new_status}")));
        }

        let job = Self::get_job(db, job_id).await?;
        let provider_user = Self::assigned_provider_user(db, &job).await?;

        let is_customer = job.customer_id == actor.id;
        let is_assigned_provider = provider_user == Some(actor.id);
        if !is_customer && !is_assigned_provider {
            return Err(AppError::Forbidden);
        }

        if !status::can_transition(&job.status, new_status) {
            return Err(AppError::Conflict(format!(
                "cannot move job from {} to {}",
                job.status, new_status
            )));
        }

        let mut tx = db.begin().await?;
        let job = sqlx::query_as::<_, Job>(
            "UPDATE jobs SET status = $2, updated_at = now(),
                 completed_at = CASE WHEN $2 = 'completed' THEN now() ELSE completed_at END
             WHERE id = $1 RETURNING *",
        )
        .bind(job_id)
        .bind(new_status)
        .fetch_one(&mut *tx)
        .await?;

        if new_status == status::COMPLETED {
            if let Some(provider_id) = job.provider_id {
                sqlx::query(
                    "UPDATE service_providers SET total_jobs = total_jobs + 1, updated_at = now()
                     WHERE id = $1",
                )
                .bind(provider_id)
                .execute(&mut *tx)
                .await?;
            }
        }
        tx.commit().await?;

        let counterpart = if is_customer {
            provider_user
        } else {
            Some(job.customer_id)
        };
        Ok((job, counterpart))
    }

    pub async fn list_updates(db: &Pool<Postgres>, job_id: Uuid) -> AppResult<Vec<JobUpdate>> {
        let updates = sqlx::query_as::<_, JobUpdate>(
            "SELECT * FROM job_updates WHERE job_id = $1 ORDER BY created_at DESC",
        )
        .bind(job_id)
        .fetch_all(db)
        .await?;
        Ok(updates)
    }

    pub async fn create_update(
        db: &Pool<Postgres>,
        job_id: Uuid,
        user_id: Uuid,
        message: &str,
        image_url: Option<&str>,
    ) -> AppResult<JobUpdate> {
        if message.trim().is_empty() {
            return Err(AppError::BadRequest("message is required".into()));
        }
        let update = sqlx::query_as::<_, JobUpdate>(
            "INSERT INTO job_updates (job_id, user_id, message, image_url)
             VALUES ($1, $2, $3, $4)
             RETURNING *",
        )
        .bind(job_id)
        .bind(user_id)
        .bind(message)
        .bind(image_url.filter(|s| !s.is_empty()))
        .fetch_one(db)
        .await?;
        Ok(update)
    }
}
