use async_trait::async_trait;
use rig::{client::CompletionClient, completion::Chat, providers::openrouter};
use suhail_flow::{SerializableMessage, to_rig_messages};
use tracing::debug;

/// A chat-completion backend. `history` excludes `input`.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn chat(
        &self,
        preamble: &str,
        input: &str,
        history: Vec<SerializableMessage>,
    ) -> anyhow::Result<String>;
}

/// OpenRouter through rig, one agent per call so each persona gets its own preamble.
pub struct OpenRouterModel {
    client: openrouter::Client,
    model: String,
    temperature: f64,
}

impl OpenRouterModel {
    pub fn new(api_key: &str, model: impl Into<String>) -> Self {
        Self {
            client: openrouter::Client::new(api_key),
            model: model.into(),
            temperature: 0.2,
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }
}

#[async_trait]
impl LanguageModel for OpenRouterModel {
    async fn chat(
        &self,
        preamble: &str,
        input: &str,
        history: Vec<SerializableMessage>,
    ) -> anyhow::Result<String> {
        debug!(model = %self.model, history = history.len(), "Calling LLM");
        let agent = self
            .client
            .agent(&self.model)
            .preamble(preamble)
            .temperature(self.temperature)
            .build();

        let response = agent
            .chat(input.to_string(), to_rig_messages(&history))
            .await
            .map_err(|e| anyhow::anyhow!("LLM request failed: {}", e))?;
        Ok(response)
    }
}
