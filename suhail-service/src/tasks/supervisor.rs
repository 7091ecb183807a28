use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use suhail_flow::{Context, GraphError, NextAction, Result, Task, TaskResult};
use tracing::{info, warn};

use super::{
    prompts::{base_prompt, supervisor_preamble},
    types::{Persona, ToolCall, session_keys},
};
use crate::llm::LanguageModel;

/// What the supervisor model answered with.
#[derive(Debug, PartialEq)]
pub enum SupervisorReply {
    Tool(ToolCall),
    /// Names a tool but its arguments don't fit
    Malformed(String),
    Text(String),
}

/// Entry point of every chat turn: answers directly or hands the turn to a tool task.
pub struct SupervisorTask {
    llm: Arc<dyn LanguageModel>,
}

impl SupervisorTask {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }
}

/// Tool tasks answer once and park the session back on the supervisor.
pub fn return_to_supervisor() -> NextAction {
    NextAction::GoTo(std::any::type_name::<SupervisorTask>().to_string())
}

#[async_trait]
impl Task for SupervisorTask {
    async fn run(&self, context: Context) -> Result<TaskResult> {
        let session_id: String = context.get(session_keys::SESSION_ID).await.unwrap_or_default();
        let user_input: String = context
            .get(session_keys::USER_INPUT)
            .await
            .ok_or_else(|| GraphError::ContextError("user_input not found".to_string()))?;
        let persona: Persona = context.get(session_keys::PERSONA).await.unwrap_or_default();
        let system_prompt: String = context
            .get(session_keys::SYSTEM_PROMPT)
            .await
            .unwrap_or_else(|| base_prompt(persona));

        info!(
            session_id = %session_id,
            task_id = %self.id(),
            persona = persona.as_str(),
            "Supervisor handling user input"
        );

        let history = context.get_all_messages().await;
        context.add_user_message(user_input.clone()).await;
        context.remove(session_keys::TOOL_CALL).await;

        let preamble = supervisor_preamble(&system_prompt, persona);
        let response = self
            .llm
            .chat(&preamble, &user_input, history)
            .await
            .map_err(|e| GraphError::TaskExecutionFailed(format!("LLM call failed: {}", e)))?;

        match parse_supervisor_reply(&response) {
            SupervisorReply::Tool(call) if persona.allows(call.name()) => {
                info!(session_id = %session_id, tool = ?call.name(), "Routing to tool");
                context.set(session_keys::TOOL_CALL, call).await;
                Ok(TaskResult::new(None, NextAction::ContinueAndExecute))
            }
            SupervisorReply::Tool(call) => {
                warn!(session_id = %session_id, tool = ?call.name(), persona = persona.as_str(), "Tool not allowed");
                let reply = "That tool isn't available in this chat. I can still help with package details or answer your question directly.".to_string();
                context.add_assistant_message(reply.clone()).await;
                Ok(TaskResult::new(Some(reply), NextAction::WaitForInput))
            }
            SupervisorReply::Malformed(tool) => {
                warn!(session_id = %session_id, tool = %tool, "Tool call with unusable arguments");
                let reply = format!(
                    "I need a few more details before I can run {}. Could you share the missing information?",
                    tool.replace('_', " ")
                );
                context.add_assistant_message(reply.clone()).await;
                Ok(TaskResult::new(Some(reply), NextAction::WaitForInput))
            }
            SupervisorReply::Text(text) => {
                context.add_assistant_message(text.clone()).await;
                Ok(TaskResult::new(Some(text), NextAction::WaitForInput))
            }
        }
    }
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// Classify a model response. Only a reply that is entirely a JSON object
/// (optionally fenced) with a `tool` field counts as a tool call.
pub fn parse_supervisor_reply(response: &str) -> SupervisorReply {
    let candidate = strip_code_fence(response);
    if !(candidate.starts_with('{') && candidate.ends_with('}')) {
        return SupervisorReply::Text(response.trim().to_string());
    }

    let Ok(value) = serde_json::from_str::<Value>(candidate) else {
        return SupervisorReply::Text(response.trim().to_string());
    };
    let Some(tool) = value.get("tool").and_then(Value::as_str).map(str::to_string) else {
        return SupervisorReply::Text(response.trim().to_string());
    };

    match serde_json::from_value::<ToolCall>(value) {
        Ok(call) => SupervisorReply::Tool(call),
        Err(_) => SupervisorReply::Malformed(tool),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedModel;
    use crate::offer::ClaimsInput;

    async fn primed_context(input: &str, persona: Persona) -> Context {
        let context = Context::new();
        context.set(session_keys::SESSION_ID, "chat-1").await;
        context.set(session_keys::USER_INPUT, input).await;
        context.set(session_keys::PERSONA, persona).await;
        context
    }

    #[test]
    fn parses_fenced_tool_calls() {
        let reply = parse_supervisor_reply(
            "```json\n{\"tool\": \"package_details\", \"arguments\": {\"package_type\": \"gold\"}}\n```",
        );
        assert_eq!(
            reply,
            SupervisorReply::Tool(ToolCall::PackageDetails {
                package_type: "gold".to_string()
            })
        );
    }

    #[test]
    fn offer_arguments_accept_unknown_claims() {
        let reply = parse_supervisor_reply(
            r#"{"tool": "offer_assessment", "arguments": {"region": "Central", "lives": 120, "budget_per_life": 1500, "target_lr": 0.75, "package": "Gold", "historical_claims_per_life": "I don't know"}}"#,
        );
        let SupervisorReply::Tool(ToolCall::OfferAssessment(request)) = reply else {
            panic!("expected an offer assessment call");
        };
        assert_eq!(request.lives, 120);
        assert_eq!(request.historical_claims_per_life, ClaimsInput::Unknown);
    }

    #[test]
    fn prose_and_partial_calls() {
        assert_eq!(
            parse_supervisor_reply("  Gold covers {dental} up to SAR 3,000. "),
            SupervisorReply::Text("Gold covers {dental} up to SAR 3,000.".to_string())
        );
        assert_eq!(
            parse_supervisor_reply(r#"{"tool": "offer_assessment", "arguments": {"region": "Central"}}"#),
            SupervisorReply::Malformed("offer_assessment".to_string())
        );
        assert!(matches!(
            parse_supervisor_reply(r#"{"answer": 42}"#),
            SupervisorReply::Text(_)
        ));
    }

    #[tokio::test]
    async fn answers_directly_and_waits() {
        let llm = Arc::new(ScriptedModel::new(["Hello! English or Arabic?"]));
        let task = SupervisorTask::new(llm.clone());
        let context = primed_context("hi", Persona::Client).await;

        let result = task.run(context.clone()).await.unwrap();

        assert_eq!(result.response.as_deref(), Some("Hello! English or Arabic?"));
        assert!(matches!(result.next_action, NextAction::WaitForInput));
        assert_eq!(context.chat_history_len().await, 2);
        assert!(llm.preambles()[0].contains("co-pilot"));
    }

    #[tokio::test]
    async fn routes_allowed_tool_calls() {
        let llm = Arc::new(ScriptedModel::new([
            r#"{"tool": "company_research", "arguments": {"company_name": "Acme"}}"#,
        ]));
        let task = SupervisorTask::new(llm);
        let context = primed_context("research Acme", Persona::General).await;

        let result = task.run(context.clone()).await.unwrap();

        assert!(result.response.is_none());
        assert!(matches!(result.next_action, NextAction::ContinueAndExecute));
        let call: ToolCall = context.get(session_keys::TOOL_CALL).await.unwrap();
        assert_eq!(call, ToolCall::CompanyResearch { company_name: "Acme".to_string() });
    }

    #[tokio::test]
    async fn manager_cannot_run_offer_assessment() {
        let llm = Arc::new(ScriptedModel::new([
            r#"{"tool": "offer_assessment", "arguments": {"region": "Central", "lives": 10, "budget_per_life": 900, "target_lr": 0.7, "package": "Basic"}}"#,
        ]));
        let task = SupervisorTask::new(llm);
        let context = primed_context("assess an offer", Persona::Manager).await;

        let result = task.run(context.clone()).await.unwrap();

        assert!(matches!(result.next_action, NextAction::WaitForInput));
        assert!(result.response.unwrap().contains("isn't available"));
        assert!(context.get::<ToolCall>(session_keys::TOOL_CALL).await.is_none());
    }

    #[tokio::test]
    async fn llm_failure_fails_the_task() {
        let task = SupervisorTask::new(Arc::new(ScriptedModel::default()));
        let context = primed_context("hi", Persona::General).await;

        let err = task.run(context).await.unwrap_err();
        assert!(matches!(err, GraphError::TaskExecutionFailed(_)));
    }
}
