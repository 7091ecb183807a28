use async_trait::async_trait;
use suhail_flow::{Context, GraphError, Result, Task, TaskResult};
use tracing::{info, warn};

use super::{
    supervisor::return_to_supervisor,
    types::{ToolCall, session_keys},
};
use crate::research::GoogleSearch;

pub struct CompanyResearchTask {
    search: Option<GoogleSearch>,
}

impl CompanyResearchTask {
    pub fn new(search: Option<GoogleSearch>) -> Self {
        Self { search }
    }
}

#[async_trait]
impl Task for CompanyResearchTask {
    async fn run(&self, context: Context) -> Result<TaskResult> {
        let session_id: String = context.get(session_keys::SESSION_ID).await.unwrap_or_default();
        let Some(ToolCall::CompanyResearch { company_name }) = context.get(session_keys::TOOL_CALL).await else {
            return Err(GraphError::ContextError("company_research call not found".to_string()));
        };
        context.remove(session_keys::TOOL_CALL).await;

        info!(session_id = %session_id, task_id = %self.id(), company = %company_name, "Researching company");

        let response = match &self.search {
            None => "Company research isn't configured on this server, so I can't look that company up right now.".to_string(),
            Some(search) => match search.company_insight(&company_name).await {
                Ok(insight) if !insight.one_liner.is_empty() => {
                    format!("**Company insight**: {}", insight.one_liner)
                }
                Ok(_) => format!("I couldn't find a reliable public summary for {}.", company_name.trim()),
                Err(e) => {
                    warn!(session_id = %session_id, error = %e, "Company research failed");
                    format!("Company research for {} failed, please try again later.", company_name.trim())
                }
            },
        };

        context.add_assistant_message(response.clone()).await;
        Ok(TaskResult::new(Some(response), return_to_supervisor()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_search_says_so() {
        let task = CompanyResearchTask::new(None);
        let context = Context::new();
        context
            .set(
                session_keys::TOOL_CALL,
                ToolCall::CompanyResearch {
                    company_name: "Acme".to_string(),
                },
            )
            .await;

        let result = task.run(context.clone()).await.unwrap();

        assert!(result.response.unwrap().contains("isn't configured"));
        assert_eq!(result.next_action, return_to_supervisor());
        assert_eq!(context.chat_history_len().await, 1);
    }

    #[tokio::test]
    async fn wrong_call_is_a_context_error() {
        let task = CompanyResearchTask::new(None);
        let context = Context::new();
        context
            .set(
                session_keys::TOOL_CALL,
                ToolCall::PackageDetails {
                    package_type: "gold".to_string(),
                },
            )
            .await;

        assert!(matches!(task.run(context).await, Err(GraphError::ContextError(_))));
    }
}
