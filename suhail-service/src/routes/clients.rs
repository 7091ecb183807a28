use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, warn};

use super::require_text;
use crate::{
    auth::CurrentUser,
    error::{ApiResult, not_found_error, repository_error},
    service::AppState,
};

#[derive(Debug, Deserialize)]
pub struct NewClientRequest {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RenameClientRequest {
    pub new_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClientEntry {
    pub name: String,
}

pub fn client_chat_title(client_name: &str) -> String {
    format!("Chat with {}", client_name)
}

pub async fn create_client(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<NewClientRequest>,
) -> ApiResult<Value> {
    let name = require_text(request.name.as_deref(), "Client name required")?;

    let chat = state
        .chats
        .create(current.id(), &client_chat_title(name), Some(name))
        .await
        .map_err(|e| repository_error("Failed to create client", e))?;

    info!(user_id = current.id(), client = name, chat_id = %chat.id, "Client created");
    Ok(Json(json!({ "name": name, "success": true, "chat_id": chat.id })))
}

pub async fn list_clients(State(state): State<AppState>, current: CurrentUser) -> ApiResult<Vec<ClientEntry>> {
    let names = state
        .chats
        .client_names(current.id())
        .await
        .map_err(|e| repository_error("Failed to list clients", e))?;
    Ok(Json(names.into_iter().map(|name| ClientEntry { name }).collect()))
}

pub async fn find_client_chat(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(client_name): Path<String>,
) -> ApiResult<Value> {
    let chat = state
        .chats
        .find_client_chat(current.id(), &client_name)
        .await
        .map_err(|e| repository_error("Failed to find client chat", e))?;

    Ok(Json(match chat {
        Some(chat) => json!({ "chat_id": chat.id, "exists": true }),
        None => json!({ "exists": false }),
    }))
}

pub async fn delete_client(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(client_name): Path<String>,
) -> ApiResult<Value> {
    let chat_ids = state
        .chats
        .client_chat_ids(current.id(), &client_name)
        .await
        .map_err(|e| repository_error("Failed to load client chats", e))?;

    let deleted = state
        .chats
        .delete_client(current.id(), &client_name)
        .await
        .map_err(|e| repository_error("Failed to delete client", e))?;

    for chat_id in &chat_ids {
        if let Err(e) = state.session_storage.delete(chat_id).await {
            warn!(chat_id = %chat_id, error = %e, "Failed to drop conversation state");
        }
    }

    info!(user_id = current.id(), client = %client_name, deleted, "Client deleted");
    Ok(Json(json!({ "success": true, "deleted_chats": deleted })))
}

pub async fn rename_client(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(old_name): Path<String>,
    Json(request): Json<RenameClientRequest>,
) -> ApiResult<Value> {
    let new_name = require_text(request.new_name.as_deref(), "New name required")?;

    let updated = state
        .chats
        .rename_client(current.id(), &old_name, new_name)
        .await
        .map_err(|e| repository_error("Failed to rename client", e))?;
    if updated == 0 {
        return Err(not_found_error("Client not found"));
    }

    Ok(Json(json!({ "success": true, "updated_chats": updated, "new_name": new_name })))
}
