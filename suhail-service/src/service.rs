use std::sync::Arc;

use anyhow::Context as _;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
};
use suhail_flow::{FlowRunner, SessionStorage, SqliteSessionStorage};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::{
    auth::{Role, hash_password},
    config::Config,
    db::{
        self, DbPool, SqlChatRepository, SqlNotificationRepository, SqlSummaryRepository,
        SqlTranscriptRepository, SqlUserRepository,
    },
    historical::HistoricalDataset,
    llm::{LanguageModel, OpenRouterModel},
    pdf::PdfGenerator,
    research::GoogleSearch,
    routes,
    transcript::{OpenAiTranscriber, SpeechToText},
    workflow::create_flow_runner,
};

pub const ADMIN_USERNAME: &str = "admin";
const MAX_AUDIO_BYTES: usize = 50 * 1024 * 1024;

/// External collaborators of the service, swapped for fakes in tests.
pub struct Integrations {
    pub llm: Arc<dyn LanguageModel>,
    pub dataset: HistoricalDataset,
    pub research: Option<GoogleSearch>,
    pub speech: Option<Arc<dyn SpeechToText>>,
    pub pdf: PdfGenerator,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pool: DbPool,
    pub users: SqlUserRepository,
    pub chats: SqlChatRepository,
    pub summaries: SqlSummaryRepository,
    pub notifications: SqlNotificationRepository,
    pub transcripts: SqlTranscriptRepository,
    pub session_storage: Arc<dyn SessionStorage>,
    pub flow_runner: FlowRunner,
    pub llm: Arc<dyn LanguageModel>,
    pub dataset: Arc<HistoricalDataset>,
    pub speech: Option<Arc<dyn SpeechToText>>,
    pub pdf: Arc<PdfGenerator>,
}

impl AppState {
    /// Wire repositories and the chat workflow over a migrated pool.
    pub async fn new(config: Config, pool: DbPool, integrations: Integrations) -> anyhow::Result<Self> {
        let session_storage: Arc<dyn SessionStorage> = Arc::new(
            SqliteSessionStorage::new(pool.clone())
                .await
                .context("Failed to prepare session storage")?,
        );

        let dataset = Arc::new(integrations.dataset);
        let flow_runner = create_flow_runner(
            session_storage.clone(),
            integrations.llm.clone(),
            dataset.clone(),
            integrations.research,
        );

        Ok(Self {
            config: Arc::new(config),
            users: SqlUserRepository::new(pool.clone()),
            chats: SqlChatRepository::new(pool.clone()),
            summaries: SqlSummaryRepository::new(pool.clone()),
            notifications: SqlNotificationRepository::new(pool.clone()),
            transcripts: SqlTranscriptRepository::new(pool.clone()),
            pool,
            session_storage,
            flow_runner,
            llm: integrations.llm,
            dataset,
            speech: integrations.speech,
            pdf: Arc::new(integrations.pdf),
        })
    }

    /// Create the `admin` account from the configured password if it is missing.
    pub async fn seed_admin(&self) -> anyhow::Result<()> {
        let Some(password) = self.config.admin_password.clone() else {
            return Ok(());
        };
        if self.users.find_by_username(ADMIN_USERNAME).await?.is_some() {
            return Ok(());
        }

        let iterations = self.config.password_iterations;
        let hash = tokio::task::spawn_blocking(move || hash_password(&password, iterations)).await?;
        self.users.create(ADMIN_USERNAME, &hash, Role::Admin, None).await?;
        info!("Seeded admin account");
        Ok(())
    }
}

pub async fn create_app(config: Config) -> anyhow::Result<Router> {
    let app_state = create_app_state(config).await?;
    Ok(build_router(app_state))
}

async fn create_app_state(config: Config) -> anyhow::Result<AppState> {
    let pool = db::connect(&config.database_url)
        .await
        .with_context(|| format!("Failed to open database {}", config.database_url))?;
    db::run_migrations(&pool).await.context("Failed to run migrations")?;

    let dataset = HistoricalDataset::load_or_empty(&config.historical_data_path).unwrap_or_else(|e| {
        warn!(
            path = %config.historical_data_path.display(),
            error = %e,
            "Historical dataset unusable, offer assessment disabled"
        );
        HistoricalDataset::default()
    });
    info!(records = dataset.len(), "Historical dataset loaded");

    let research = GoogleSearch::from_keys(config.google_api_key.as_deref(), config.google_cse_id.as_deref());
    if research.is_none() {
        warn!("GOOGLE_API_KEY/GOOGLE_CSE_ID not set, company research disabled");
    }

    let speech = config.openai_api_key.as_deref().map(|key| {
        Arc::new(OpenAiTranscriber::new(key, config.stt_model.clone())) as Arc<dyn SpeechToText>
    });
    if speech.is_none() {
        warn!("OPENAI_API_KEY not set, transcription disabled");
    }

    let integrations = Integrations {
        llm: Arc::new(OpenRouterModel::new(&config.openrouter_api_key, config.llm_model.clone())),
        dataset,
        research,
        speech,
        pdf: PdfGenerator::new()?,
    };

    let app_state = AppState::new(config, pool, integrations).await?;
    app_state.seed_admin().await?;
    Ok(app_state)
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::root))
        .route("/health", get(routes::health_check))
        // auth
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/me", get(routes::auth::me))
        // admin
        .route(
            "/admin/users",
            get(routes::admin::list_users).post(routes::admin::create_user),
        )
        .route(
            "/admin/users/{user_id}",
            put(routes::admin::update_user).delete(routes::admin::delete_user),
        )
        // chats
        .route("/v1/chat/newchat", post(routes::chat::new_chat))
        .route("/v1/chat/agent", post(routes::chat::agent_chat))
        .route("/v1/chat/sessions", get(routes::chat::list_sessions))
        .route("/v1/chat/recent", get(routes::chat::recent_chats))
        .route("/v1/chat/loadchat/{chat_id}", get(routes::chat::load_chat))
        .route("/v1/chat/renamechat", post(routes::chat::rename_chat))
        .route("/v1/chat/deletechat", post(routes::chat::delete_chat))
        .route("/v1/chat/summary", post(routes::chat::summarize_chat))
        // clients
        .route(
            "/v1/clients",
            get(routes::clients::list_clients).post(routes::clients::create_client),
        )
        .route("/v1/clients/{client_name}/chat", get(routes::clients::find_client_chat))
        .route("/v1/clients/{client_name}", delete(routes::clients::delete_client))
        .route("/v1/clients/{client_name}/rename", put(routes::clients::rename_client))
        // notifications
        .route("/api/team-message", post(routes::notifications::create_team_message))
        .route("/api/notifications/unread", get(routes::notifications::unread))
        .route("/api/notifications/mark-read", post(routes::notifications::mark_read))
        // dashboards
        .route("/manager/dashboard", get(routes::manager::dashboard))
        .route("/manager/team", get(routes::manager::team))
        .route("/manager/agents", get(routes::manager::agents))
        .route(
            "/manager/agent-summary/{agent_id}",
            post(routes::manager::agent_summary_chat),
        )
        .route("/sme/dashboard", get(routes::sme::dashboard))
        // offers & packages
        .route("/v1/offers/assess", post(routes::offers::assess))
        .route("/v1/packages/{package}", get(routes::offers::package))
        // transcripts
        .route(
            "/api/transcribe",
            post(routes::transcripts::transcribe).layer(DefaultBodyLimit::max(MAX_AUDIO_BYTES)),
        )
        .route("/v1/transcripts", get(routes::transcripts::list))
        .route(
            "/v1/transcripts/{transcript_id}/download",
            get(routes::transcripts::download),
        )
        .route("/v1/transcripts/{transcript_id}", delete(routes::transcripts::remove))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
