use serde::{Deserialize, Serialize};

use crate::offer::OfferRequest;

/// Context keys shared by the workflow tasks and the chat handler.
pub mod session_keys {
    pub const USER_INPUT: &str = "user_input";
    pub const SESSION_ID: &str = "session_id";
    pub const PERSONA: &str = "persona";
    pub const SYSTEM_PROMPT: &str = "system_prompt";
    pub const TOOL_CALL: &str = "tool_call";
    pub const LAST_ASSESSMENT: &str = "last_assessment";
    pub const AGENT_SUMMARY_INJECTED: &str = "agent_summary_injected";
}

/// Which assistant answers a chat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
    /// Sales manager assistant with live dashboard figures
    Manager,
    /// Meeting co-pilot for a client chat
    Client,
    /// General sales assistant
    #[default]
    General,
}

impl Persona {
    pub fn allowed_tools(self) -> &'static [ToolName] {
        match self {
            Persona::Manager => &[ToolName::PackageDetails],
            Persona::Client | Persona::General => &[
                ToolName::PackageDetails,
                ToolName::OfferAssessment,
                ToolName::CompanyResearch,
            ],
        }
    }

    pub fn allows(self, tool: ToolName) -> bool {
        self.allowed_tools().contains(&tool)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Persona::Manager => "manager",
            Persona::Client => "client",
            Persona::General => "general",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    PackageDetails,
    OfferAssessment,
    CompanyResearch,
}

/// A tool invocation emitted by the supervisor model, e.g.
/// `{"tool": "package_details", "arguments": {"package_type": "gold"}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool", content = "arguments", rename_all = "snake_case")]
pub enum ToolCall {
    PackageDetails { package_type: String },
    OfferAssessment(OfferRequest),
    CompanyResearch { company_name: String },
}

impl ToolCall {
    pub fn name(&self) -> ToolName {
        match self {
            ToolCall::PackageDetails { .. } => ToolName::PackageDetails,
            ToolCall::OfferAssessment(_) => ToolName::OfferAssessment,
            ToolCall::CompanyResearch { .. } => ToolName::CompanyResearch,
        }
    }
}
