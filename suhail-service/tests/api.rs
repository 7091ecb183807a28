use std::{collections::HashMap, path::Path, sync::Arc};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use suhail_flow::SerializableMessage;
use suhail_service::{
    AppState, Config, Integrations, build_router, db,
    historical::{HistoricalDataset, HistoricalRecord},
    llm::LanguageModel,
    pdf::PdfGenerator,
    transcript::{Segment, SpeechToText, Transcription, TranscriptionError},
};
use tower::ServiceExt;

/// Answers by recognising which prompt it was given.
struct FakeModel;

#[async_trait]
impl LanguageModel for FakeModel {
    async fn chat(&self, preamble: &str, input: &str, _history: Vec<SerializableMessage>) -> anyhow::Result<String> {
        if preamble.starts_with("You are a helpful assistant that summarizes") {
            return Ok("Client wants Gold cover for 120 lives.".to_string());
        }
        if preamble.starts_with("You are a health insurance package specialist") {
            return Ok("Gold: SAR 1,500,000 annual limit.".to_string());
        }
        if input.contains("gold package") {
            return Ok(r#"{"tool": "package_details", "arguments": {"package_type": "gold"}}"#.to_string());
        }
        Ok(format!("reply: {}", input))
    }
}

/// A model whose backend is down.
struct FailingModel;

#[async_trait]
impl LanguageModel for FailingModel {
    async fn chat(&self, _preamble: &str, _input: &str, _history: Vec<SerializableMessage>) -> anyhow::Result<String> {
        anyhow::bail!("upstream unavailable")
    }
}

struct FakeSpeech;

#[async_trait]
impl SpeechToText for FakeSpeech {
    async fn transcribe(&self, audio: Vec<u8>, _filename: &str) -> Result<Transcription, TranscriptionError> {
        assert!(!audio.is_empty());
        Ok(Transcription {
            model: "whisper-1".to_string(),
            segments: vec![
                Segment { start: 0.0, end: 4.0, text: "Hello everyone".to_string() },
                Segment { start: 4.0, end: 9.5, text: "Let's review the Gold offer".to_string() },
            ],
            language: Some("english".to_string()),
            timed: true,
        })
    }
}

fn record(region: &str, package: &str, lives: f64, loss_ratio: f64, premium: f64, claims: f64) -> HistoricalRecord {
    HistoricalRecord {
        region: region.to_string(),
        package: package.to_string(),
        lives,
        loss_ratio,
        premium,
        claims,
    }
}

async fn test_app(upload_dir: &Path) -> Router {
    test_app_with_model(upload_dir, Arc::new(FakeModel)).await
}

async fn test_app_with_model(upload_dir: &Path, llm: Arc<dyn LanguageModel>) -> Router {
    let vars: HashMap<&str, String> = HashMap::from([
        ("OPENROUTER_API_KEY", "test-key".to_string()),
        ("JWT_SECRET", "test-secret".to_string()),
        ("PASSWORD_ITERATIONS", "1000".to_string()),
        ("ADMIN_PASSWORD", "admin-pass".to_string()),
        ("UPLOAD_DIR", upload_dir.to_string_lossy().to_string()),
    ]);
    let config = Config::from_lookup(|key| vars.get(key).cloned()).unwrap();

    let pool = db::connect_in_memory().await.unwrap();
    db::run_migrations(&pool).await.unwrap();

    let integrations = Integrations {
        llm,
        dataset: HistoricalDataset::new(vec![
            record("Central", "D. Gold Package", 100.0, 0.6, 1100.0, 100_000.0),
            record("Central", "D. Gold Package", 300.0, 0.8, 1300.0, 300_000.0),
            record("Western", "A. Basic Package", 50.0, 0.5, 300.0, 10_000.0),
        ]),
        research: None,
        speech: Some(Arc::new(FakeSpeech)),
        pdf: PdfGenerator::with_converter(None).unwrap(),
    };

    let state = AppState::new(config, pool, integrations).await.unwrap();
    state.seed_admin().await.unwrap();
    build_router(state)
}

async fn call(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn signup(app: &Router, username: &str, role: &str) -> String {
    let (status, _) = call(
        app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "username": username, "password": "pw-123", "role": role })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    login(app, username, "pw-123").await
}

async fn login(app: &Router, username: &str, password: &str) -> String {
    let (status, body) = call(
        app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "username": username, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed for {username}: {body}");
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_is_public() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path()).await;

    let (status, body) = call(&app, "GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn register_login_and_me() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path()).await;

    let token = signup(&app, "sara", "salesagent").await;
    let (status, me) = call(&app, "GET", "/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "sara");
    assert_eq!(me["role"], "salesagent");
    assert!(me.get("password_hash").is_none());

    let (status, _) = call(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "username": "sara", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(&app, "GET", "/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = call(&app, "GET", "/auth/me", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn registration_rules() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path()).await;

    signup(&app, "omar", "manager").await;
    let (status, _) = call(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "username": "omar", "password": "x", "role": "salesagent" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "username": "root", "password": "x", "role": "admin" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_manages_users() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path()).await;
    let admin = login(&app, "admin", "admin-pass").await;
    let agent = signup(&app, "lina", "salesagent").await;

    let (status, _) = call(&app, "GET", "/admin/users", Some(&agent), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, created) = call(
        &app,
        "POST",
        "/admin/users",
        Some(&admin),
        Some(json!({ "username": "noor", "password": "pw", "role": "smeleader" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let noor_id = created["id"].as_i64().unwrap();

    let (status, _) = call(
        &app,
        "PUT",
        &format!("/admin/users/{}", noor_id),
        Some(&admin),
        Some(json!({ "role": "manager", "password": "new-pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let noor = login(&app, "noor", "new-pw").await;
    let (_, me) = call(&app, "GET", "/auth/me", Some(&noor), None).await;
    assert_eq!(me["role"], "manager");

    let (_, users) = call(&app, "GET", "/admin/users", Some(&admin), None).await;
    let admin_id = users
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["username"] == "admin")
        .unwrap()["id"]
        .as_i64()
        .unwrap();
    let (status, _) = call(&app, "DELETE", &format!("/admin/users/{}", admin_id), Some(&admin), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(&app, "DELETE", &format!("/admin/users/{}", noor_id), Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&app, "GET", "/auth/me", Some(&noor), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn general_chat_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path()).await;
    let token = signup(&app, "sara", "salesagent").await;

    let (status, chat) = call(&app, "POST", "/v1/chat/newchat", Some(&token), Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(chat["title"], "Untitled Chat");
    let chat_id = chat["id"].as_str().unwrap().to_string();

    let (status, reply) = call(
        &app,
        "POST",
        "/v1/chat/agent",
        Some(&token),
        Some(json!({ "chat_id": chat_id, "message": "hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["response"], "reply: hello");
    assert_eq!(reply["persona"], "general");

    let (status, reply) = call(
        &app,
        "POST",
        "/v1/chat/agent",
        Some(&token),
        Some(json!({ "chat_id": chat_id, "message": "what is in the gold package?" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["response"], "Gold: SAR 1,500,000 annual limit.");

    let (_, messages) = call(&app, "GET", &format!("/v1/chat/loadchat/{}", chat_id), Some(&token), None).await;
    let messages = messages.as_array().unwrap();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[3]["role"], "bot");

    let (_, recent) = call(&app, "GET", "/v1/chat/recent", Some(&token), None).await;
    assert_eq!(recent[0]["id"], chat_id.as_str());

    let (status, summary) = call(&app, "POST", "/v1/chat/summary", Some(&token), Some(json!({ "chat_id": chat_id }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["summary"], "Client wants Gold cover for 120 lives.");

    let (status, _) = call(
        &app,
        "POST",
        "/v1/chat/renamechat",
        Some(&token),
        Some(json!({ "chat_id": chat_id, "new_title": "Pricing questions" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, sessions) = call(&app, "GET", "/v1/chat/sessions", Some(&token), None).await;
    assert_eq!(sessions[0]["title"], "Pricing questions");

    let (status, _) = call(&app, "POST", "/v1/chat/deletechat", Some(&token), Some(json!({ "chat_id": chat_id }))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&app, "GET", &format!("/v1/chat/loadchat/{}", chat_id), Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn failed_turn_leaves_chat_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app_with_model(dir.path(), Arc::new(FailingModel)).await;
    let token = signup(&app, "sara", "salesagent").await;

    let (_, chat) = call(&app, "POST", "/v1/chat/newchat", Some(&token), Some(json!({}))).await;
    let chat_id = chat["id"].as_str().unwrap();

    let (status, _) = call(
        &app,
        "POST",
        "/v1/chat/agent",
        Some(&token),
        Some(json!({ "chat_id": chat_id, "message": "hi" })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (status, messages) = call(&app, "GET", &format!("/v1/chat/loadchat/{}", chat_id), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(messages.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn chats_are_private() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path()).await;
    let owner = signup(&app, "sara", "salesagent").await;
    let other = signup(&app, "lina", "salesagent").await;

    let (_, chat) = call(&app, "POST", "/v1/chat/newchat", Some(&owner), Some(json!({ "title": "Mine" }))).await;
    let chat_id = chat["id"].as_str().unwrap();

    let (status, _) = call(&app, "GET", &format!("/v1/chat/loadchat/{}", chat_id), Some(&other), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(
        &app,
        "POST",
        "/v1/chat/agent",
        Some(&other),
        Some(json!({ "chat_id": chat_id, "message": "hi" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&app, "POST", "/v1/chat/summary", Some(&owner), Some(json!({ "chat_id": chat_id }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn client_chats_feed_manager_summaries() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path()).await;
    let agent = signup(&app, "sara", "salesagent").await;
    let manager = signup(&app, "omar", "manager").await;

    let (status, client) = call(&app, "POST", "/v1/clients", Some(&agent), Some(json!({ "name": "Acme" }))).await;
    assert_eq!(status, StatusCode::OK);
    let chat_id = client["chat_id"].as_str().unwrap().to_string();

    let (_, sessions) = call(&app, "GET", "/v1/chat/sessions", Some(&agent), None).await;
    assert_eq!(sessions[0]["title"], "Chat with Acme");

    // Five turns store ten messages, which triggers a summary refresh.
    for turn in 0..5 {
        let (status, reply) = call(
            &app,
            "POST",
            "/v1/chat/agent",
            Some(&agent),
            Some(json!({ "chat_id": chat_id, "message": format!("update {}", turn) })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reply["persona"], "client");
    }

    let (status, agents) = call(&app, "GET", "/manager/agents", Some(&manager), None).await;
    assert_eq!(status, StatusCode::OK);
    let sara = agents.as_array().unwrap().iter().find(|a| a["username"] == "sara").unwrap();
    assert_eq!(sara["summaries"][0]["client_name"], "Acme");
    assert_eq!(sara["summaries"][0]["summary"], "Client wants Gold cover for 120 lives.");

    let sara_id = sara["id"].as_i64().unwrap();
    let (status, posted) = call(&app, "POST", &format!("/manager/agent-summary/{}", sara_id), Some(&manager), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(posted["is_existing"], false);
    assert!(posted["message"].as_str().unwrap().starts_with("In summary, Agent sara is working on 1 active clients."));

    let (_, again) = call(&app, "POST", &format!("/manager/agent-summary/{}", sara_id), Some(&manager), None).await;
    assert_eq!(again["is_existing"], true);
    assert_eq!(again["chat_id"], posted["chat_id"]);

    let (status, reply) = call(
        &app,
        "POST",
        "/v1/chat/agent",
        Some(&manager),
        Some(json!({ "chat_id": posted["chat_id"], "message": "how is sara doing?" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["persona"], "manager");

    let (status, dashboard) = call(&app, "GET", "/manager/dashboard", Some(&manager), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["summary"]["total_sellers"], 1);
    assert_eq!(dashboard["summary"]["total_accounts"], 1);
    assert_eq!(dashboard["agent_stats"][0]["client_list"][0], "Acme");

    let (status, _) = call(&app, "GET", "/manager/dashboard", Some(&agent), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn client_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path()).await;
    let token = signup(&app, "sara", "salesagent").await;

    let (status, _) = call(&app, "POST", "/v1/clients", Some(&token), Some(json!({ "name": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    call(&app, "POST", "/v1/clients", Some(&token), Some(json!({ "name": "Globex" }))).await;
    let (_, clients) = call(&app, "GET", "/v1/clients", Some(&token), None).await;
    assert_eq!(clients, json!([{ "name": "Globex" }]));

    let (status, _) = call(
        &app,
        "PUT",
        "/v1/clients/Globex/rename",
        Some(&token),
        Some(json!({ "new_name": "Globex Corp" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, found) = call(&app, "GET", "/v1/clients/Globex%20Corp/chat", Some(&token), None).await;
    assert_eq!(found["exists"], true);

    let (status, _) = call(
        &app,
        "PUT",
        "/v1/clients/Nobody/rename",
        Some(&token),
        Some(json!({ "new_name": "Somebody" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, deleted) = call(&app, "DELETE", "/v1/clients/Globex%20Corp", Some(&token), None).await;
    assert_eq!(deleted["deleted_chats"], 1);
    let (_, found) = call(&app, "GET", "/v1/clients/Globex%20Corp/chat", Some(&token), None).await;
    assert_eq!(found["exists"], false);
}

#[tokio::test]
async fn team_notifications() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path()).await;
    let manager = signup(&app, "omar", "manager").await;
    let agent = signup(&app, "sara", "salesagent").await;

    let (status, _) = call(&app, "POST", "/api/team-message", Some(&agent), Some(json!({ "message": "hi" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call(&app, "POST", "/api/team-message", Some(&manager), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    call(
        &app,
        "POST",
        "/api/team-message",
        Some(&manager),
        Some(json!({ "message": "Quarter closes Friday", "priority": "General Notes" })),
    )
    .await;
    call(
        &app,
        "POST",
        "/api/team-message",
        Some(&manager),
        Some(json!({ "message": "Office closed Sunday", "priority": "Internal Announcement" })),
    )
    .await;

    let (_, unread) = call(&app, "GET", "/api/notifications/unread", Some(&agent), None).await;
    let unread = unread.as_array().unwrap().clone();
    assert_eq!(unread.len(), 2);
    assert_eq!(unread[0]["message"], "Office closed Sunday");

    let (status, _) = call(
        &app,
        "POST",
        "/api/notifications/mark-read",
        Some(&agent),
        Some(json!({ "notification_id": unread[0]["id"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, remaining) = call(&app, "GET", "/api/notifications/unread", Some(&agent), None).await;
    assert_eq!(remaining.as_array().unwrap().len(), 1);

    let (status, _) = call(&app, "POST", "/api/notifications/mark-read", Some(&agent), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn offers_and_packages() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path()).await;
    let token = signup(&app, "sara", "salesagent").await;

    let (status, body) = call(
        &app,
        "POST",
        "/v1/offers/assess",
        Some(&token),
        Some(json!({
            "region": "Central",
            "lives": 210,
            "budget_per_life": 2000,
            "target_lr": 0.8,
            "package": "Gold",
            "historical_claims_per_life": 800
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["assessment"]["offered_lives"], 210);
    assert_eq!(body["assessment"]["target_price"], 1050.0);
    assert!(body["report"].as_str().unwrap().contains("Package Comparison Table"));

    let (status, body) = call(
        &app,
        "POST",
        "/v1/offers/assess",
        Some(&token),
        Some(json!({ "region": "Northern", "lives": 10, "budget_per_life": 900, "target_lr": 0.7, "package": "Gold" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("Available regions: Central, Western"));

    let (status, _) = call(
        &app,
        "POST",
        "/v1/offers/assess",
        Some(&token),
        Some(json!({ "region": "Central", "lives": 0, "budget_per_life": 900, "target_lr": 0.7, "package": "Gold" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, packages) = call(&app, "GET", "/v1/packages/diamond", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(packages[0]["room_type"], "VIP suite");
    let (status, _) = call(&app, "GET", "/v1/packages/platinum", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn sme_dashboard_requires_role() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path()).await;
    let sme = signup(&app, "noor", "smeleader").await;
    let agent = signup(&app, "sara", "salesagent").await;

    let (status, dashboard) = call(&app, "GET", "/sme/dashboard", Some(&sme), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["total_contracts"], 3);
    assert_eq!(dashboard["segments"].as_array().unwrap().len(), 2);

    let (status, _) = call(&app, "GET", "/sme/dashboard", Some(&agent), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn transcript_upload_list_download_delete() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path()).await;
    let token = signup(&app, "sara", "salesagent").await;

    let boundary = "suhail-test-boundary";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\nAcme kick-off\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"audio\"; filename=\"call.webm\"\r\nContent-Type: audio/webm\r\n\r\nFAKEAUDIO\r\n\
         --{b}--\r\n",
        b = boundary
    );
    let request = Request::builder()
        .method("POST")
        .uri("/api/transcribe")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", boundary))
        .body(Body::from(body))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let uploaded: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(uploaded["title"], "Acme kick-off");
    assert_eq!(uploaded["speakers"], 1);
    let id = uploaded["transcript_id"].as_i64().unwrap();

    let (_, list) = call(&app, "GET", "/v1/transcripts", Some(&token), None).await;
    assert_eq!(
        list[0]["preview"],
        "[00:00:00–00:00:04] Speaker 1: Hello everyone\n[00:00:04–00:00:09] Speaker 1: Let's review the Gold offer"
    );
    assert_eq!(list[0]["file_url"], format!("/v1/transcripts/{}/download", id));

    let request = Request::builder()
        .uri(format!("/v1/transcripts/{}/download", id))
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/html; charset=utf-8");
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8_lossy(&bytes).contains("review the Gold offer"));

    let (status, _) = call(&app, "DELETE", &format!("/v1/transcripts/{}", id), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&app, "GET", &format!("/v1/transcripts/{}/download", id), Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
