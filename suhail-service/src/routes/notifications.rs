use axum::{extract::State, response::Json};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use super::require_text;
use crate::{
    auth::{CurrentUser, Role},
    db::{NotificationPriority, TeamNotification},
    error::{ApiResult, bad_request_error, not_found_error, repository_error},
    service::AppState,
};

#[derive(Debug, Deserialize)]
pub struct TeamMessageRequest {
    pub message: Option<String>,
    #[serde(default)]
    pub priority: NotificationPriority,
}

#[derive(Debug, Deserialize)]
pub struct MarkReadRequest {
    pub notification_id: Option<i64>,
}

pub async fn create_team_message(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<TeamMessageRequest>,
) -> ApiResult<Value> {
    current.require_role(Role::Manager)?;
    let message = require_text(request.message.as_deref(), "Message is required")?;

    let notification = state
        .notifications
        .create(current.id(), message, request.priority)
        .await
        .map_err(|e| repository_error("Failed to send notification", e))?;

    info!(
        manager_id = current.id(),
        notification_id = notification.id,
        priority = notification.priority.label(),
        "Team notification sent"
    );
    Ok(Json(json!({ "success": true, "message": "Notification sent successfully" })))
}

pub async fn unread(State(state): State<AppState>, current: CurrentUser) -> ApiResult<Vec<TeamNotification>> {
    let notifications = state
        .notifications
        .unread_for_user(current.id())
        .await
        .map_err(|e| repository_error("Failed to load notifications", e))?;
    Ok(Json(notifications))
}

pub async fn mark_read(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<MarkReadRequest>,
) -> ApiResult<Value> {
    let notification_id = request
        .notification_id
        .ok_or_else(|| bad_request_error("Notification ID required"))?;

    let found = state
        .notifications
        .mark_read(notification_id, current.id())
        .await
        .map_err(|e| repository_error("Failed to mark notification read", e))?;
    if !found {
        return Err(not_found_error("Notification not found"));
    }
    Ok(Json(json!({ "success": true })))
}
