use crate::error::AppError;
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

/// JSON error body returned for every failed request
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status: u16,
    pub error_type: &'static str,
}

/// Map domain errors to HTTP responses
pub fn map_error(err: &AppError) -> (StatusCode, ErrorResponse) {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let error_type = match err {
        AppError::BadRequest(_) => "validation_error",
        AppError::Unauthorized => "authentication_error",
        AppError::Forbidden => "authorization_error",
        AppError::NotFound => "not_found_error",
        AppError::Conflict(_) => "conflict_error",
        AppError::Config(_) | AppError::StartServer(_) => "server_error",
        AppError::Database(_) | AppError::Internal => "server_error",
    };

    let response = ErrorResponse {
        error: match status {
            StatusCode::BAD_REQUEST => "Bad Request",
            StatusCode::UNAUTHORIZED => "Unauthorized",
            StatusCode::FORBIDDEN => "Forbidden",
            StatusCode::NOT_FOUND => "Not Found",
            StatusCode::CONFLICT => "Conflict",
            StatusCode::INTERNAL_SERVER_ERROR => "Internal Server Error",
            _ => "Error",
        }
        .to_string(),
        message: err.to_string(),
        status: status.as_u16(),
        error_type,
    };

    (status, response)
}

pub fn into_response(err: AppError) -> impl IntoResponse {
    let (status, response) = map_error(&err);
    (status, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404_body() {
        let (status, body) = map_error(&AppError::NotFound);
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error_type, "not_found_error");
        assert_eq!(body.status, 404);
    }

    #[test]
    fn database_errors_do_not_leak_details_in_error_type() {
        let (status, body) = map_error(&AppError::Database(sqlx::Error::PoolTimedOut));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error_type, "server_error");
    }
}
