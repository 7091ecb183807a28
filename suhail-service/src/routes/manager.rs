use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::info;

use crate::{
    auth::{CurrentUser, Role},
    dashboard::{ManagerDashboard, manager_dashboard},
    db::{Sender, User},
    error::{ApiResult, not_found_error, repository_error},
    service::AppState,
    summary::{agent_summary_message, agent_summary_title},
};

#[derive(Debug, Serialize)]
pub struct SummaryEntry {
    pub client_name: String,
    pub summary: String,
}

#[derive(Debug, Serialize)]
pub struct AgentOverview {
    pub id: i64,
    pub username: String,
    pub summaries: Vec<SummaryEntry>,
}

pub async fn dashboard(State(state): State<AppState>, current: CurrentUser) -> ApiResult<ManagerDashboard> {
    current.require_role(Role::Manager)?;
    let dashboard = manager_dashboard(&state.users, &state.chats)
        .await
        .map_err(|e| repository_error("Failed to build dashboard", e))?;
    Ok(Json(dashboard))
}

pub async fn team(State(state): State<AppState>, current: CurrentUser) -> ApiResult<Vec<User>> {
    current.require_role(Role::Manager)?;
    let agents = state
        .users
        .list_by_role(Role::SalesAgent)
        .await
        .map_err(|e| repository_error("Failed to list team", e))?;
    Ok(Json(agents))
}

/// Sales agents with the latest summary of each of their clients.
pub async fn agents(State(state): State<AppState>, current: CurrentUser) -> ApiResult<Vec<AgentOverview>> {
    current.require_role(Role::Manager)?;
    let agents = state
        .users
        .list_by_role(Role::SalesAgent)
        .await
        .map_err(|e| repository_error("Failed to list agents", e))?;

    let mut overview = Vec::with_capacity(agents.len());
    for agent in agents {
        let summaries = state
            .summaries
            .list_for_user(agent.id)
            .await
            .map_err(|e| repository_error("Failed to load client summaries", e))?;
        overview.push(AgentOverview {
            id: agent.id,
            username: agent.username,
            summaries: summaries
                .into_iter()
                .map(|s| SummaryEntry {
                    client_name: s.client_name,
                    summary: s.summary,
                })
                .collect(),
        });
    }
    Ok(Json(overview))
}

/// Post an agent's client summaries into the manager's summary chat for
/// that agent, reusing the newest chat with the same title.
pub async fn agent_summary_chat(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(agent_id): Path<i64>,
) -> ApiResult<Value> {
    current.require_role(Role::Manager)?;

    let agent = state
        .users
        .find_by_id(agent_id)
        .await
        .map_err(|e| repository_error("Failed to load agent", e))?
        .ok_or_else(|| not_found_error("Agent not found"))?;

    let summaries = state
        .summaries
        .list_for_user(agent.id)
        .await
        .map_err(|e| repository_error("Failed to load client summaries", e))?;
    let message = agent_summary_message(&agent.username, &summaries);
    let title = agent_summary_title(&agent.username);

    let existing = state
        .chats
        .latest_with_title(current.id(), &title)
        .await
        .map_err(|e| repository_error("Failed to look up summary chat", e))?;
    let is_existing = existing.is_some();
    let chat = match existing {
        Some(chat) => chat,
        None => state
            .chats
            .create(current.id(), &title, None)
            .await
            .map_err(|e| repository_error("Failed to create summary chat", e))?,
    };

    state
        .chats
        .add_message(&chat.id, current.id(), &message, Sender::Bot)
        .await
        .map_err(|e| repository_error("Failed to post agent summary", e))?;

    info!(manager_id = current.id(), agent_id, chat_id = %chat.id, is_existing, "Agent summary posted");
    Ok(Json(json!({
        "success": true,
        "chat_id": chat.id,
        "message": message,
        "is_existing": is_existing
    })))
}
