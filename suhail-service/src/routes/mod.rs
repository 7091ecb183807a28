//! HTTP handlers, grouped by the area of the API they serve.

use axum::response::Json;
use serde_json::{Value, json};

use crate::{
    auth::hash_password,
    error::{ApiError, internal_error},
};

pub mod admin;
pub mod auth;
pub mod chat;
pub mod clients;
pub mod manager;
pub mod notifications;
pub mod offers;
pub mod sme;
pub mod transcripts;

pub async fn root() -> Json<Value> {
    Json(json!({
        "service": "Suhail Sales Assistant Service",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "AI sales co-pilot for health insurance agents, managers and SME leaders",
        "endpoints": {
            "POST /auth/login": "Exchange credentials for a bearer token",
            "POST /v1/chat/newchat": "Start a chat",
            "POST /v1/chat/agent": "Send a message to the assistant",
            "POST /v1/offers/assess": "Assess an offer against historical data",
            "GET /manager/dashboard": "Manager dashboard",
            "GET /sme/dashboard": "SME dashboard",
            "POST /api/transcribe": "Transcribe a meeting recording",
            "GET /health": "Health check"
        }
    }))
}

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// PBKDF2 is CPU bound, so it runs off the async workers.
pub(crate) async fn hash_off_thread(password: String, iterations: u32) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || hash_password(&password, iterations))
        .await
        .map_err(|e| internal_error("Failed to hash password", &e.to_string()))
}

pub(crate) fn require_text<'a>(value: Option<&'a str>, message: &str) -> Result<&'a str, ApiError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| crate::error::bad_request_error(message))
}
