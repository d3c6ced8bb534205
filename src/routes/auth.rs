use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::middleware::auth::issue_token;
use crate::middleware::guards::CurrentUser;
use crate::models::User;
use crate::services::auth_service::{AuthService, NewUser, ProfileChanges};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub role: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub phone_number: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    if req.password_confirm != req.password {
        return Err(crate::error::AppError::BadRequest(
            "passwords do not match".into(),
        ));
    }
    let user = AuthService::register(
        &state.db,
        NewUser {
            username: &req.username,
            email: &req.email,
            password: &req.password,
            role: &req.role,
            first_name: &req.first_name,
            last_name: &req.last_name,
            phone_number: req.phone_number.as_deref(),
            address: req.address.as_deref(),
        },
    )
    .await?;

    let token = issue_token(user.id, &state.config.jwt_secret, state.config.token_ttl_hours)?;
    Ok((StatusCode::CREATED, Json(AuthResponse { user, token })))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let user = AuthService::authenticate(&state.db, &req.username, &req.password).await?;
    let token = issue_token(user.id, &state.config.jwt_secret, state.config.token_ttl_hours)?;
    Ok(Json(AuthResponse { user, token }))
}

pub async fn me(State(state): State<AppState>, current: CurrentUser) -> AppResult<Json<User>> {
    let user = AuthService::get_user(&state.db, current.id).await?;
    Ok(Json(user))
}

pub async fn update_me(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(req): Json<UpdateProfileRequest>,
) -> AppResult<Json<User>> {
    let user = AuthService::update_profile(
        &state.db,
        current.id,
        ProfileChanges {
            first_name: req.first_name.as_deref(),
            last_name: req.last_name.as_deref(),
            phone_number: req.phone_number.as_deref(),
            address: req.address.as_deref(),
        },
    )
    .await?;
    Ok(Json(user))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_payload_requires_a_confirmation_field() {
        let missing = serde_json::from_value::<RegisterRequest>(serde_json::json!({
            "username": "sam",
            "email": "sam@example.com",
            "password": "hunter2hunter2",
            "role": "customer",
        }));
        assert!(missing.is_err());

        let complete = serde_json::from_value::<RegisterRequest>(serde_json::json!({
            "username": "sam",
            "email": "sam@example.com",
            "password": "hunter2hunter2",
            "password_confirm": "hunter2hunter2",
            "role": "customer",
        }));
        assert!(complete.is_ok());
    }
}
