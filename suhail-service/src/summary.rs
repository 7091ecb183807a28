//! Conversation transcripts and LLM summaries of client chats.

use tracing::info;

use crate::{
    db::{ChatMessage, ClientSummary, Sender},
    llm::LanguageModel,
};

/// A client chat summary is regenerated every this many messages.
pub const SUMMARY_EVERY: i64 = 5;
/// Messages fed to the summarizer.
pub const SUMMARY_WINDOW: i64 = 10;

const SUMMARY_PREAMBLE: &str = "You are a helpful assistant that summarizes conversations.";

/// `[YYYY-MM-DD HH:MM:SS] User|Bot: message` lines in the given order.
pub fn extract_transcript(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|m| {
            let speaker = match m.sender {
                Sender::User => "User",
                Sender::Bot => "Bot",
            };
            format!(
                "[{}] {}: {}",
                m.timestamp.format("%Y-%m-%d %H:%M:%S"),
                speaker,
                m.message
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub async fn generate_summary(llm: &dyn LanguageModel, transcript: &str) -> anyhow::Result<String> {
    let prompt = format!(
        r#"Please provide a concise summary of the following conversation transcript.
Make sure to include:
- Client name if available
- Key topics discussed
- Action items or next steps
- Important decisions made

Transcript:
{}

Summary:"#,
        transcript
    );

    let summary = llm.chat(SUMMARY_PREAMBLE, &prompt, Vec::new()).await?;
    info!(chars = summary.len(), "Generated conversation summary");
    Ok(summary.trim().to_string())
}

pub fn should_refresh_summary(message_count: i64) -> bool {
    message_count > 0 && message_count % SUMMARY_EVERY == 0
}

/// The bot message that opens a manager's agent-summary chat.
pub fn agent_summary_message(agent_username: &str, summaries: &[ClientSummary]) -> String {
    let mut message = format!(
        "In summary, Agent {} is working on {} active clients.\n\nHere are the updates:\n",
        agent_username,
        summaries.len()
    );
    for summary in summaries {
        message.push_str(&format!("- {}: {}\n", summary.client_name, summary.summary));
    }
    message
}

pub fn agent_summary_title(agent_username: &str) -> String {
    format!("Summary: {}'s Clients", agent_username)
}
