use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{hash_off_thread, require_text};
use crate::{
    auth::{CurrentUser, Role, issue_jwt, verify_password},
    db::User,
    error::{ApiResult, bad_request_error, internal_error, repository_error, unauthorized_error},
    service::AppState,
};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_at: i64,
    pub user: User,
}

pub async fn register(State(state): State<AppState>, Json(request): Json<RegisterRequest>) -> ApiResult<User> {
    let username = require_text(request.username.as_deref(), "Username is required")?;
    let password = require_text(request.password.as_deref(), "Password is required")?;
    if request.role == Role::Admin {
        return Err(bad_request_error("Admin accounts cannot be self-registered"));
    }

    let hash = hash_off_thread(password.to_string(), state.config.password_iterations).await?;
    let user = state
        .users
        .create(username, &hash, request.role, None)
        .await
        .map_err(|e| repository_error("Failed to register user", e))?;

    info!(user_id = user.id, role = user.role.as_str(), "User registered");
    Ok(Json(user))
}

pub async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> ApiResult<LoginResponse> {
    let user = state
        .users
        .find_by_username(request.username.trim())
        .await
        .map_err(|e| repository_error("Failed to load user", e))?
        .ok_or_else(|| unauthorized_error("Invalid credentials"))?;

    let stored = user.password_hash.clone();
    let password = request.password;
    let valid = tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .map_err(|e| internal_error("Failed to verify password", &e.to_string()))?
        .unwrap_or_else(|e| {
            warn!(user_id = user.id, error = %e, "Stored password hash is unusable");
            false
        });
    if !valid {
        return Err(unauthorized_error("Invalid credentials"));
    }

    let (token, expires_at) = issue_jwt(&user, &state.config.jwt_secret, state.config.jwt_ttl_hours)
        .map_err(|e| internal_error("Failed to issue token", &e.to_string()))?;

    info!(user_id = user.id, "User logged in");
    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer",
        expires_at,
        user,
    }))
}

pub async fn me(CurrentUser(user): CurrentUser) -> ApiResult<User> {
    Ok(Json(user))
}
