use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::guards::CurrentUser;
use crate::models::notification::kinds;
use crate::models::{ProviderAvailability, Review, ServiceCategory, ServiceProvider};
use crate::services::catalog_service::{
    AvailabilitySlotInput, CatalogService, NewProviderProfile, ProviderListing,
};
use crate::services::notification_service::NotificationService;
use crate::services::review_service::{ReviewService, ReviewWithAuthor};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ProviderFilter {
    pub category: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct ProviderDetail {
    #[serde(flatten)]
    pub provider: ProviderListing,
    pub categories: Vec<ServiceCategory>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProfileRequest {
    pub business_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub skills: String,
    #[serde(default)]
    pub experience_years: i32,
    pub hourly_rate_cents: Option<i64>,
    #[serde(default)]
    pub service_area: String,
    pub license_number: Option<String>,
    #[serde(default)]
    pub category_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    pub job_id: Uuid,
    pub rating: i32,
    #[serde(default)]
    pub comment: String,
}

pub async fn list_providers(
    State(state): State<AppState>,
    Query(filter): Query<ProviderFilter>,
) -> AppResult<Json<Vec<ProviderListing>>> {
    let providers = CatalogService::list_providers(&state.db, filter.category).await?;
    Ok(Json(providers))
}

pub async fn get_provider(
    State(state): State<AppState>,
    Path(provider_id): Path<Uuid>,
) -> AppResult<Json<ProviderDetail>> {
    let (provider, categories) = CatalogService::get_provider(&state.db, provider_id).await?;
    Ok(Json(ProviderDetail {
        provider,
        categories,
    }))
}

pub async fn create_profile(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(req): Json<CreateProfileRequest>,
) -> AppResult<(StatusCode, Json<ServiceProvider>)> {
    let provider = CatalogService::create_profile(
        &state.db,
        current.id,
        NewProviderProfile {
            business_name: &req.business_name,
            description: &req.description,
            skills: &req.skills,
            experience_years: req.experience_years,
            hourly_rate_cents: req.hourly_rate_cents,
            service_area: &req.service_area,
            license_number: req.license_number.as_deref(),
            category_ids: &req.category_ids,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(provider)))
}

async fn owned_provider(
    state: &AppState,
    provider_id: Uuid,
    user_id: Uuid,
) -> AppResult<ProviderListing> {
    let (provider, _) = CatalogService::get_provider(&state.db, provider_id).await?;
    if provider.user_id != user_id {
        return Err(AppError::Forbidden);
    }
    Ok(provider)
}

pub async fn get_availability(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(provider_id): Path<Uuid>,
) -> AppResult<Json<Vec<ProviderAvailability>>> {
    owned_provider(&state, provider_id, current.id).await?;
    let slots = CatalogService::get_availability(&state.db, provider_id).await?;
    Ok(Json(slots))
}

pub async fn set_availability(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(provider_id): Path<Uuid>,
    Json(slots): Json<Vec<AvailabilitySlotInput>>,
) -> AppResult<Json<Vec<ProviderAvailability>>> {
    owned_provider(&state, provider_id, current.id).await?;
    let slots = CatalogService::set_availability(&state.db, provider_id, &slots).await?;
    Ok(Json(slots))
}

pub async fn list_reviews(
    State(state): State<AppState>,
    Path(provider_id): Path<Uuid>,
) -> AppResult<Json<Vec<ReviewWithAuthor>>> {
    let reviews = ReviewService::list_for_provider(&state.db, provider_id).await?;
    Ok(Json(reviews))
}

pub async fn create_review(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(provider_id): Path<Uuid>,
    Json(req): Json<CreateReviewRequest>,
) -> AppResult<(StatusCode, Json<Review>)> {
    let (provider, _) = CatalogService::get_provider(&state.db, provider_id).await?;

    let review = ReviewService::create(
        &state.db,
        provider_id,
        current.id,
        req.job_id,
        req.rating,
        &req.comment,
    )
    .await?;

    NotificationService::notify(
        &state,
        provider.user_id,
        "New review",
        &format!("You received a {}-star review", review.rating),
        kinds::NEW_REVIEW,
        serde_json::json!({
            "job_id": review.job_id,
            "review_id": review.id,
            "rating": review.rating,
        }),
    )
    .await;

    Ok((StatusCode::CREATED, Json(review)))
}
