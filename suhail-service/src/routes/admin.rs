use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use super::{hash_off_thread, require_text};
use crate::{
    auth::{CurrentUser, Role},
    db::User,
    error::{ApiResult, forbidden_error, not_found_error, repository_error},
    service::{ADMIN_USERNAME, AppState},
};

#[derive(Debug, Deserialize)]
pub struct NewUserRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub manager_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub role: Role,
    /// Blank keeps the current password.
    #[serde(default)]
    pub password: Option<String>,
}

pub async fn list_users(State(state): State<AppState>, current: CurrentUser) -> ApiResult<Vec<User>> {
    current.require_role(Role::Admin)?;
    let users = state
        .users
        .list_all()
        .await
        .map_err(|e| repository_error("Failed to list users", e))?;
    Ok(Json(users))
}

pub async fn create_user(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<NewUserRequest>,
) -> ApiResult<User> {
    current.require_role(Role::Admin)?;
    let username = require_text(request.username.as_deref(), "Username is required")?;
    let password = require_text(request.password.as_deref(), "Password is required")?;

    let hash = hash_off_thread(password.to_string(), state.config.password_iterations).await?;
    let user = state
        .users
        .create(username, &hash, request.role, request.manager_id)
        .await
        .map_err(|e| repository_error("Failed to create user", e))?;

    info!(admin_id = current.id(), user_id = user.id, "User created");
    Ok(Json(user))
}

pub async fn update_user(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(user_id): Path<i64>,
    Json(request): Json<UpdateUserRequest>,
) -> ApiResult<Value> {
    current.require_role(Role::Admin)?;

    let hash = match request.password.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        Some(password) => Some(hash_off_thread(password.to_string(), state.config.password_iterations).await?),
        None => None,
    };

    let updated = state
        .users
        .update(user_id, request.role, hash.as_deref())
        .await
        .map_err(|e| repository_error("Failed to update user", e))?;
    if !updated {
        return Err(not_found_error("User not found"));
    }

    info!(admin_id = current.id(), user_id, role = request.role.as_str(), "User updated");
    Ok(Json(json!({ "success": true })))
}

pub async fn delete_user(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(user_id): Path<i64>,
) -> ApiResult<Value> {
    current.require_role(Role::Admin)?;

    let user = state
        .users
        .find_by_id(user_id)
        .await
        .map_err(|e| repository_error("Failed to load user", e))?
        .ok_or_else(|| not_found_error("User not found"))?;
    if user.username == ADMIN_USERNAME {
        return Err(forbidden_error("The admin account cannot be deleted"));
    }

    state
        .users
        .delete(user_id)
        .await
        .map_err(|e| repository_error("Failed to delete user", e))?;

    info!(admin_id = current.id(), user_id, "User deleted");
    Ok(Json(json!({ "success": true })))
}
