use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::guards::{AdminUser, CurrentUser};
use crate::models::ServiceCategory;
use crate::services::catalog_service::CatalogService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
}

pub async fn list_categories(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<ServiceCategory>>> {
    let categories = CatalogService::list_categories(&state.db).await?;
    Ok(Json(categories))
}

pub async fn create_category(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(req): Json<CreateCategoryRequest>,
) -> AppResult<(StatusCode, Json<ServiceCategory>)> {
    AdminUser::verify(&state.db, current.id).await?;
    let category =
        CatalogService::create_category(&state.db, &req.name, &req.description, &req.icon).await?;
    Ok((StatusCode::CREATED, Json(category)))
}
