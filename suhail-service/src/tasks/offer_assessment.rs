use std::sync::Arc;

use async_trait::async_trait;
use suhail_flow::{Context, GraphError, Result, Task, TaskResult};
use tracing::{info, warn};

use super::{
    prompts::OFFER_COMMENTARY_PROMPT,
    supervisor::return_to_supervisor,
    types::{ToolCall, session_keys},
};
use crate::{
    historical::HistoricalDataset,
    llm::LanguageModel,
    offer::{OfferError, assess_offer},
};

/// Prices an offer against the historical book and adds a short recommendation.
pub struct OfferAssessmentTask {
    llm: Arc<dyn LanguageModel>,
    dataset: Arc<HistoricalDataset>,
}

impl OfferAssessmentTask {
    pub fn new(llm: Arc<dyn LanguageModel>, dataset: Arc<HistoricalDataset>) -> Self {
        Self { llm, dataset }
    }
}

#[async_trait]
impl Task for OfferAssessmentTask {
    async fn run(&self, context: Context) -> Result<TaskResult> {
        let session_id: String = context.get(session_keys::SESSION_ID).await.unwrap_or_default();
        let Some(ToolCall::OfferAssessment(request)) = context.get(session_keys::TOOL_CALL).await else {
            return Err(GraphError::ContextError("offer_assessment call not found".to_string()));
        };
        context.remove(session_keys::TOOL_CALL).await;

        info!(
            session_id = %session_id,
            task_id = %self.id(),
            region = %request.region,
            package = %request.package,
            lives = request.lives,
            "Assessing offer"
        );

        let response = match assess_offer(&self.dataset, &request) {
            Ok(assessment) => {
                let report = assessment.report();
                context.set(session_keys::LAST_ASSESSMENT, &assessment).await;

                match self.llm.chat(OFFER_COMMENTARY_PROMPT, &report, Vec::new()).await {
                    Ok(commentary) => format!("{}\n{}", report, commentary.trim()),
                    Err(e) => {
                        warn!(session_id = %session_id, error = %e, "Offer commentary failed, returning report only");
                        report
                    }
                }
            }
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Offer assessment rejected");
                explain(&e)
            }
        };

        context.add_assistant_message(response.clone()).await;
        Ok(TaskResult::new(Some(response), return_to_supervisor()))
    }
}

fn explain(error: &OfferError) -> String {
    match error {
        OfferError::NoHistoricalData => {
            "⚠️ No historical data is loaded, so I can't assess this offer yet. Please ask an administrator to upload the historical spreadsheet.".to_string()
        }
        OfferError::InvalidInput(reason) => {
            format!("⚠️ I couldn't assess the offer: {}. Could you correct that detail?", reason)
        }
        other => format!("⚠️ {}", other),
    }
}
