//! JSON error responses shared by the HTTP handlers.

use axum::{http::StatusCode, response::Json};
use serde_json::{Value, json};
use tracing::error;

use crate::db::RepositoryError;

pub type ApiResult<T> = Result<Json<T>, ApiError>;
pub type ApiError = (StatusCode, Json<Value>);

pub fn bad_request_error(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

pub fn unauthorized_error(message: &str) -> ApiError {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": message })))
}

pub fn forbidden_error(message: &str) -> ApiError {
    (StatusCode::FORBIDDEN, Json(json!({ "error": message })))
}

pub fn not_found_error(message: &str) -> ApiError {
    (StatusCode::NOT_FOUND, Json(json!({ "error": message })))
}

pub fn conflict_error(message: &str) -> ApiError {
    (StatusCode::CONFLICT, Json(json!({ "error": message })))
}

pub fn service_unavailable_error(message: &str) -> ApiError {
    (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "error": message })))
}

pub fn internal_error(message: &str, details: &str) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": message,
            "details": details
        })),
    )
}

/// Log a repository failure and turn it into a response.
pub fn repository_error(context: &str, e: RepositoryError) -> ApiError {
    match e {
        RepositoryError::Conflict(message) => conflict_error(&message),
        other => {
            error!(error = %other, "{}", context);
            internal_error(context, &other.to_string())
        }
    }
}
