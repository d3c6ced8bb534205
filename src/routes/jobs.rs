use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::guards::CurrentUser;
use crate::models::notification::kinds;
use crate::models::{chat::Conversation, Job, JobApplication, JobUpdate, User};
use crate::services::auth_service::AuthService;
use crate::services::catalog_service::CatalogService;
use crate::services::job_service::{
    ApplicationWithProvider, JobService, NewApplication, NewJob,
};
use crate::services::notification_service::NotificationService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub category_id: Uuid,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub address: String,
    pub preferred_date: NaiveDate,
    pub preferred_time: String,
    #[serde(default = "default_urgency")]
    pub urgency: String,
    pub estimated_price_cents: Option<i64>,
}

fn default_urgency() -> String {
    crate::models::job::urgency::NORMAL.to_string()
}

#[derive(Debug, Deserialize)]
pub struct ApplyRequest {
    #[serde(default)]
    pub message: String,
    pub proposed_price_cents: Option<i64>,
    pub estimated_duration: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    pub action: String, // accept | reject
}

#[derive(Debug, Serialize)]
pub struct RespondResponse {
    pub application: JobApplication,
    pub job: Job,
    pub conversation: Option<Conversation>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUpdateRequest {
    pub message: String,
    pub image_url: Option<String>,
}

async fn current_user(state: &AppState, current: &CurrentUser) -> AppResult<User> {
    AuthService::get_user(&state.db, current.id).await
}

pub async fn create_job(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(req): Json<CreateJobRequest>,
) -> AppResult<(StatusCode, Json<Job>)> {
    let user = current_user(&state, &current).await?;
    let job = JobService::create_job(
        &state.db,
        &user,
        NewJob {
            category_id: req.category_id,
            title: &req.title,
            description: &req.description,
            address: &req.address,
            preferred_date: req.preferred_date,
            preferred_time: &req.preferred_time,
            urgency: &req.urgency,
            estimated_price_cents: req.estimated_price_cents,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(job)))
}

pub async fn list_jobs(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<Json<Vec<Job>>> {
    let user = current_user(&state, &current).await?;
    let jobs = JobService::list_jobs(&state.db, &user).await?;
    Ok(Json(jobs))
}

pub async fn get_job(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(job_id): Path<Uuid>,
) -> AppResult<Json<Job>> {
    let user = current_user(&state, &current).await?;
    let job = JobService::get_job_visible(&state.db, &user, job_id).await?;
    Ok(Json(job))
}

pub async fn apply(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(job_id): Path<Uuid>,
    Json(req): Json<ApplyRequest>,
) -> AppResult<(StatusCode, Json<JobApplication>)> {
    let provider = CatalogService::provider_by_user(&state.db, current.id)
        .await?
        .ok_or(AppError::Forbidden)?;

    let (application, job) = JobService::apply(
        &state.db,
        job_id,
        provider.id,
        NewApplication {
            message: &req.message,
            proposed_price_cents: req.proposed_price_cents,
            estimated_duration: req.estimated_duration.as_deref(),
        },
    )
    .await?;

    NotificationService::notify(
        &state,
        job.customer_id,
        "New application",
        &format!("{} applied to \"{}\"", provider.business_name, job.title),
        kinds::JOB_APPLICATION,
        serde_json::json!({ "job_id": job.id, "application_id": application.id }),
    )
    .await;

    Ok((StatusCode::CREATED, Json(application)))
}

pub async fn list_applications(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(job_id): Path<Uuid>,
) -> AppResult<Json<Vec<ApplicationWithProvider>>> {
    let job = JobService::get_job(&state.db, job_id).await?;
    if job.customer_id != current.id {
        return Err(AppError::Forbidden);
    }
    let applications = JobService::list_applications(&state.db, job_id).await?;
    Ok(Json(applications))
}

pub async fn respond(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(application_id): Path<Uuid>,
    Json(req): Json<RespondRequest>,
) -> AppResult<Json<RespondResponse>> {
    let accept = match req.action.as_str() {
        "accept" => true,
        "reject" => false,
        _ => {
            return Err(AppError::BadRequest(
                "action must be accept or reject".into(),
            ))
        }
    };

    let outcome = JobService::respond(&state.db, application_id, current.id, accept).await?;

    let (title, body) = if accept {
        (
            "Application accepted",
            format!("You were hired for \"{}\"", outcome.job.title),
        )
    } else {
        (
            "Application declined",
            format!("Your application to \"{}\" was declined", outcome.job.title),
        )
    };
    NotificationService::notify(
        &state,
        outcome.provider_user_id,
        title,
        &body,
        kinds::APPLICATION_RESPONSE,
        serde_json::json!({
            "job_id": outcome.job.id,
            "application_id": outcome.application.id,
            "status": outcome.application.status,
        }),
    )
    .await;

    Ok(Json(RespondResponse {
        application: outcome.application,
        job: outcome.job,
        conversation: outcome.conversation,
    }))
}

pub async fn update_status(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(job_id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> AppResult<Json<Job>> {
    let user = current_user(&state, &current).await?;
    let (job, counterpart) =
        JobService::update_status(&state.db, job_id, &user, &req.status).await?;

    if let Some(counterpart) = counterpart {
        NotificationService::notify(
            &state,
            counterpart,
            "Job status changed",
            &format!("\"{}\" is now {}", job.title, job.status),
            kinds::JOB_STATUS,
            serde_json::json!({ "job_id": job.id, "status": job.status }),
        )
        .await;
    }

    Ok(Json(job))
}

/// Both parties of a job may read and post progress updates
async fn job_for_participant(state: &AppState, user: &User, job_id: Uuid) -> AppResult<(Job, Option<Uuid>)> {
    let job = JobService::get_job(&state.db, job_id).await?;
    let provider_user = JobService::assigned_provider_user(&state.db, &job).await?;
    if job.customer_id != user.id && provider_user != Some(user.id) {
        return Err(AppError::Forbidden);
    }
    Ok((job, provider_user))
}

pub async fn list_updates(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(job_id): Path<Uuid>,
) -> AppResult<Json<Vec<JobUpdate>>> {
    let user = current_user(&state, &current).await?;
    job_for_participant(&state, &user, job_id).await?;
    let updates = JobService::list_updates(&state.db, job_id).await?;
    Ok(Json(updates))
}

pub async fn create_update(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(job_id): Path<Uuid>,
    Json(req): Json<CreateUpdateRequest>,
) -> AppResult<(StatusCode, Json<JobUpdate>)> {
    let user = current_user(&state, &current).await?;
    let (job, provider_user) = job_for_participant(&state, &user, job_id).await?;

    let update = JobService::create_update(
        &state.db,
        job_id,
        user.id,
        &req.message,
        req.image_url.as_deref(),
    )
    .await?;

    let counterpart = if user.id == job.customer_id {
        provider_user
    } else {
        Some(job.customer_id)
    };
    if let Some(counterpart) = counterpart {
        NotificationService::notify(
            &state,
            counterpart,
            "Job update",
            &format!("{}: {}", user.display_name(), update.message),
            kinds::JOB_UPDATE,
            serde_json::json!({ "job_id": job.id, "update_id": update.id }),
        )
        .await;
    }

    Ok((StatusCode::CREATED, Json(update)))
}
