use std::sync::Arc;

use async_trait::async_trait;
use suhail_flow::{Context, GraphError, Result, Task, TaskResult};
use tracing::info;

use super::{
    prompts::PACKAGE_DETAILS_PROMPT,
    supervisor::return_to_supervisor,
    types::{ToolCall, session_keys},
};
use crate::{catalog::package_details, llm::LanguageModel};

/// Looks up a package benefit table and lets the model phrase it.
pub struct PackageDetailsTask {
    llm: Arc<dyn LanguageModel>,
}

impl PackageDetailsTask {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Task for PackageDetailsTask {
    async fn run(&self, context: Context) -> Result<TaskResult> {
        let session_id: String = context.get(session_keys::SESSION_ID).await.unwrap_or_default();
        let Some(ToolCall::PackageDetails { package_type }) = context.get(session_keys::TOOL_CALL).await else {
            return Err(GraphError::ContextError("package_details call not found".to_string()));
        };
        context.remove(session_keys::TOOL_CALL).await;

        let packages = package_details(&package_type);
        info!(
            session_id = %session_id,
            task_id = %self.id(),
            package = %package_type,
            found = packages.len(),
            "Looking up package details"
        );

        let data = serde_json::to_string_pretty(&packages)
            .map_err(|e| GraphError::TaskExecutionFailed(format!("Failed to encode package data: {}", e)))?;
        let user_input: String = context.get(session_keys::USER_INPUT).await.unwrap_or_default();
        let prompt = format!(
            "User question: {}\n\nRequested package: {}\n\nPackage data:\n{}",
            user_input, package_type, data
        );

        let response = self
            .llm
            .chat(PACKAGE_DETAILS_PROMPT, &prompt, Vec::new())
            .await
            .map_err(|e| GraphError::TaskExecutionFailed(format!("LLM call failed: {}", e)))?;

        context.add_assistant_message(response.clone()).await;

        Ok(TaskResult::new(Some(response), return_to_supervisor()))
    }
}
