use axum::{
    extract::{Path, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{error, info, warn};

use super::require_text;
use crate::{
    auth::{CurrentUser, Role},
    dashboard::{manager_dashboard, manager_prompt_context},
    db::{ChatSession, RecentChat, Sender, chats::DEFAULT_CHAT_TITLE},
    error::{ApiError, ApiResult, internal_error, not_found_error, repository_error},
    notifications::format_for_prompt,
    service::AppState,
    summary::{
        SUMMARY_WINDOW, agent_summary_message, extract_transcript, generate_summary, should_refresh_summary,
    },
    tasks::{
        Persona,
        prompts::{GENERAL_PROMPT, client_prompt, manager_prompt},
        session_keys,
    },
};

const FALLBACK_REPLY: &str = "I'm sorry, I couldn't produce a response. Please try again.";

#[derive(Debug, Deserialize)]
pub struct NewChatRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub client_name: Option<String>,
    /// Managers open a chat seeded with this agent's client summaries.
    #[serde(default)]
    pub agent_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct AgentChatRequest {
    pub chat_id: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct AgentChatResponse {
    pub chat_id: String,
    pub response: String,
    pub persona: Persona,
}

#[derive(Debug, Deserialize)]
pub struct ChatIdRequest {
    pub chat_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RenameChatRequest {
    pub chat_id: Option<String>,
    pub new_title: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoadedMessage {
    pub content: String,
    pub role: Sender,
    pub timestamp: DateTime<Utc>,
}

async fn owned_chat(state: &AppState, chat_id: &str, user_id: i64) -> Result<ChatSession, ApiError> {
    state
        .chats
        .find_for_user(chat_id, user_id)
        .await
        .map_err(|e| repository_error("Failed to load chat", e))?
        .ok_or_else(|| not_found_error("Chat not found"))
}

pub async fn new_chat(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<NewChatRequest>,
) -> ApiResult<Value> {
    let title = request
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_CHAT_TITLE);
    let client_name = request.client_name.as_deref().map(str::trim).filter(|c| !c.is_empty());

    let chat = state
        .chats
        .create(current.id(), title, client_name)
        .await
        .map_err(|e| repository_error("Failed to create chat", e))?;

    if let (Some(agent_id), Role::Manager) = (request.agent_id, current.role()) {
        let agent = state
            .users
            .find_by_id(agent_id)
            .await
            .map_err(|e| repository_error("Failed to load agent", e))?;
        if let Some(agent) = agent {
            let summaries = state
                .summaries
                .list_for_user(agent.id)
                .await
                .map_err(|e| repository_error("Failed to load client summaries", e))?;
            state
                .chats
                .add_message(&chat.id, current.id(), &agent_summary_message(&agent.username, &summaries), Sender::Bot)
                .await
                .map_err(|e| repository_error("Failed to seed chat", e))?;
        }
    }

    info!(user_id = current.id(), chat_id = %chat.id, client = ?chat.client_name, "Chat created");
    Ok(Json(json!({ "id": chat.id, "title": chat.title })))
}

/// Persona and system prompt for a chat, by user role and chat kind.
async fn persona_for(state: &AppState, current: &CurrentUser, chat: &ChatSession) -> Result<(Persona, String), ApiError> {
    if current.role() == Role::Manager {
        let dashboard = manager_dashboard(&state.users, &state.chats)
            .await
            .map_err(|e| repository_error("Failed to build dashboard", e))?;
        return Ok((Persona::Manager, manager_prompt(&manager_prompt_context(&dashboard))));
    }

    if chat.is_client_chat() {
        let unread = state
            .notifications
            .unread_for_user(current.id())
            .await
            .map_err(|e| repository_error("Failed to load notifications", e))?;
        return Ok((Persona::Client, client_prompt(&format_for_prompt(&unread))));
    }

    Ok((Persona::General, GENERAL_PROMPT.to_string()))
}

pub async fn agent_chat(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<AgentChatRequest>,
) -> ApiResult<AgentChatResponse> {
    let message = require_text(Some(&request.message), "Message is required")?;
    let chat = owned_chat(&state, &request.chat_id, current.id()).await?;
    let asked_at = Utc::now();

    let (persona, system_prompt) = persona_for(&state, &current, &chat).await?;

    let (session, created) = state.flow_runner.load_or_start(&chat.id).await.map_err(|e| {
        error!(chat_id = %chat.id, error = %e, "Failed to load conversation state");
        internal_error("Failed to load conversation", &e.to_string())
    })?;

    if persona == Persona::Manager
        && !session
            .context
            .get::<bool>(session_keys::AGENT_SUMMARY_INJECTED)
            .await
            .unwrap_or(false)
    {
        let first = state
            .chats
            .first_message(&chat.id)
            .await
            .map_err(|e| repository_error("Failed to load chat", e))?;
        if let Some(first) = first.filter(|m| m.sender == Sender::Bot) {
            session
                .context
                .add_system_message(format!("Previous context - Agent Summary: {}", first.message))
                .await;
        }
        session.context.set(session_keys::AGENT_SUMMARY_INJECTED, true).await;
    }

    session.context.set(session_keys::SESSION_ID, chat.id.clone()).await;
    session.context.set(session_keys::USER_INPUT, message.to_string()).await;
    session.context.set(session_keys::PERSONA, persona).await;
    session.context.set(session_keys::SYSTEM_PROMPT, system_prompt).await;

    info!(
        user_id = current.id(),
        chat_id = %chat.id,
        persona = persona.as_str(),
        new_session = created,
        "Running chat turn"
    );

    let result = state.flow_runner.run_session(session).await.map_err(|e| {
        error!(chat_id = %chat.id, error = %e, "Chat turn failed");
        internal_error("Failed to generate a response", &e.to_string())
    })?;

    let response = result.response.unwrap_or_else(|| FALLBACK_REPLY.to_string());
    state
        .chats
        .add_exchange(&chat.id, current.id(), asked_at, message, &response)
        .await
        .map_err(|e| repository_error("Failed to save messages", e))?;

    if let Some(client_name) = chat.client_name.as_deref().filter(|_| chat.is_client_chat()) {
        refresh_client_summary(&state, &chat.id, current.id(), client_name).await;
    }

    Ok(Json(AgentChatResponse {
        chat_id: chat.id,
        response,
        persona,
    }))
}

/// Regenerate the client summary every few messages. Failures are logged,
/// the chat reply has already been stored.
async fn refresh_client_summary(state: &AppState, chat_id: &str, user_id: i64, client_name: &str) {
    let count = match state.chats.count_messages(chat_id).await {
        Ok(count) => count,
        Err(e) => {
            warn!(chat_id, error = %e, "Failed to count messages");
            return;
        }
    };
    if !should_refresh_summary(count) {
        return;
    }

    let messages = match state.chats.recent_messages(chat_id, SUMMARY_WINDOW).await {
        Ok(messages) => messages,
        Err(e) => {
            warn!(chat_id, error = %e, "Failed to load messages for summary");
            return;
        }
    };

    match generate_summary(state.llm.as_ref(), &extract_transcript(&messages)).await {
        Ok(summary) => {
            if let Err(e) = state.summaries.upsert(user_id, client_name, &summary, count).await {
                warn!(chat_id, error = %e, "Failed to store client summary");
            } else {
                info!(chat_id, client = client_name, message_count = count, "Client summary refreshed");
            }
        }
        Err(e) => warn!(chat_id, error = %e, "Client summary generation failed"),
    }
}

pub async fn list_sessions(State(state): State<AppState>, current: CurrentUser) -> ApiResult<Vec<ChatSession>> {
    let chats = state
        .chats
        .list_for_user(current.id())
        .await
        .map_err(|e| repository_error("Failed to list chats", e))?;
    Ok(Json(chats))
}

pub async fn recent_chats(State(state): State<AppState>, current: CurrentUser) -> ApiResult<Vec<RecentChat>> {
    let chats = state
        .chats
        .recent_general(current.id())
        .await
        .map_err(|e| repository_error("Failed to list recent chats", e))?;
    Ok(Json(chats))
}

pub async fn load_chat(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(chat_id): Path<String>,
) -> ApiResult<Vec<LoadedMessage>> {
    let chat = owned_chat(&state, &chat_id, current.id()).await?;
    let messages = state
        .chats
        .messages(&chat.id)
        .await
        .map_err(|e| repository_error("Failed to load messages", e))?;

    Ok(Json(
        messages
            .into_iter()
            .map(|m| LoadedMessage {
                content: m.message,
                role: m.sender,
                timestamp: m.timestamp,
            })
            .collect(),
    ))
}

pub async fn rename_chat(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<RenameChatRequest>,
) -> ApiResult<Value> {
    let chat_id = require_text(request.chat_id.as_deref(), "Chat ID is required")?;
    let title = require_text(request.new_title.as_deref(), "New title is required")?;

    let renamed = state
        .chats
        .rename(chat_id, current.id(), title)
        .await
        .map_err(|e| repository_error("Failed to rename chat", e))?;
    if !renamed {
        return Err(not_found_error("Chat not found"));
    }
    Ok(Json(json!({ "success": true })))
}

pub async fn delete_chat(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<ChatIdRequest>,
) -> ApiResult<Value> {
    let chat_id = require_text(request.chat_id.as_deref(), "Chat ID is required")?;

    let deleted = state
        .chats
        .delete(chat_id, current.id())
        .await
        .map_err(|e| repository_error("Failed to delete chat", e))?;
    if !deleted {
        return Err(not_found_error("Chat not found"));
    }

    if let Err(e) = state.session_storage.delete(chat_id).await {
        warn!(chat_id, error = %e, "Failed to drop conversation state");
    }

    info!(user_id = current.id(), chat_id, "Chat deleted");
    Ok(Json(json!({ "success": true, "message": "Chat deleted successfully" })))
}

pub async fn summarize_chat(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<ChatIdRequest>,
) -> ApiResult<Value> {
    let chat_id = require_text(request.chat_id.as_deref(), "Chat ID is required")?;
    let chat = owned_chat(&state, chat_id, current.id()).await?;

    let messages = state
        .chats
        .messages(&chat.id)
        .await
        .map_err(|e| repository_error("Failed to load messages", e))?;
    if messages.is_empty() {
        return Err(not_found_error("No messages found in this chat"));
    }

    let summary = generate_summary(state.llm.as_ref(), &extract_transcript(&messages))
        .await
        .map_err(|e| {
            error!(chat_id = %chat.id, error = %e, "Chat summary failed");
            internal_error("Failed to generate summary", &e.to_string())
        })?;

    Ok(Json(json!({ "summary": summary, "success": true })))
}
