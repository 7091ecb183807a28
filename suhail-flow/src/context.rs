use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::warn;

/// Who authored a message in the conversation history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

/// A chat message that survives session persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializableMessage {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl SerializableMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }
}

/// Bounded conversation history. When `max_messages` is set the oldest
/// messages are dropped first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatHistory {
    messages: Vec<SerializableMessage>,
    max_messages: Option<usize>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_messages(max: usize) -> Self {
        Self {
            messages: Vec::new(),
            max_messages: Some(max.max(1)),
        }
    }

    pub fn push(&mut self, message: SerializableMessage) {
        self.messages.push(message);
        if let Some(max) = self.max_messages {
            if self.messages.len() > max {
                let overflow = self.messages.len() - max;
                self.messages.drain(..overflow);
            }
        }
    }

    pub fn messages(&self) -> &[SerializableMessage] {
        &self.messages
    }

    pub fn last(&self, n: usize) -> &[SerializableMessage] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

/// State shared by the tasks of one conversation: arbitrary JSON values plus
/// the running chat history.
#[derive(Clone, Debug)]
pub struct Context {
    data: Arc<DashMap<String, Value>>,
    chat_history: Arc<RwLock<ChatHistory>>,
}

impl Context {
    pub fn new() -> Self {
        Self {
            data: Arc::new(DashMap::new()),
            chat_history: Arc::new(RwLock::new(ChatHistory::new())),
        }
    }

    /// Context whose chat history keeps at most `max` messages.
    pub fn with_max_chat_messages(max: usize) -> Self {
        Self {
            data: Arc::new(DashMap::new()),
            chat_history: Arc::new(RwLock::new(ChatHistory::with_max_messages(max))),
        }
    }

    pub async fn set(&self, key: impl Into<String>, value: impl Serialize) {
        self.set_sync(key, value);
    }

    pub fn set_sync(&self, key: impl Into<String>, value: impl Serialize) {
        let key = key.into();
        match serde_json::to_value(value) {
            Ok(value) => {
                self.data.insert(key, value);
            }
            Err(e) => warn!(key = %key, error = %e, "Dropping context value that failed to serialize"),
        }
    }

    pub async fn get<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get_sync(key)
    }

    /// Synchronous read, usable from edge conditions.
    pub fn get_sync<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub async fn remove(&self, key: &str) -> Option<Value> {
        self.data.remove(key).map(|(_, v)| v)
    }

    pub async fn clear(&self) {
        self.data.clear();
    }

    pub async fn add_user_message(&self, content: impl Into<String>) {
        self.push_message(SerializableMessage::user(content));
    }

    pub async fn add_assistant_message(&self, content: impl Into<String>) {
        self.push_message(SerializableMessage::assistant(content));
    }

    pub async fn add_system_message(&self, content: impl Into<String>) {
        self.push_message(SerializableMessage::system(content));
    }

    fn push_message(&self, message: SerializableMessage) {
        self.chat_history
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message);
    }

    pub async fn get_all_messages(&self) -> Vec<SerializableMessage> {
        self.history_snapshot().messages().to_vec()
    }

    pub async fn get_last_messages(&self, n: usize) -> Vec<SerializableMessage> {
        self.history_snapshot().last(n).to_vec()
    }

    pub async fn chat_history_len(&self) -> usize {
        self.history_snapshot().len()
    }

    pub async fn clear_chat_history(&self) {
        self.chat_history
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn history_snapshot(&self) -> ChatHistory {
        self.chat_history
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Chat history converted for rig agents. rig has no system role, so
    /// system messages are sent as tagged user messages.
    #[cfg(feature = "rig")]
    pub async fn get_rig_messages(&self) -> Vec<rig::completion::Message> {
        to_rig_messages(&self.get_all_messages().await)
    }
}

#[cfg(feature = "rig")]
pub fn to_rig_messages(messages: &[SerializableMessage]) -> Vec<rig::completion::Message> {
    use rig::completion::Message;

    messages
        .iter()
        .map(|msg| match msg.role {
            MessageRole::User => Message::user(msg.content.clone()),
            MessageRole::Assistant => Message::assistant(msg.content.clone()),
            MessageRole::System => Message::user(format!("[SYSTEM] {}", msg.content)),
        })
        .collect()
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize, Deserialize)]
struct ContextSnapshot {
    #[serde(default)]
    data: HashMap<String, Value>,
    #[serde(default)]
    chat_history: ChatHistory,
}

impl Serialize for Context {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let snapshot = ContextSnapshot {
            data: self
                .data
                .iter()
                .map(|entry| (entry.key().clone(), entry.value().clone()))
                .collect(),
            chat_history: self.history_snapshot(),
        };
        snapshot.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Context {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let snapshot = ContextSnapshot::deserialize(deserializer)?;
        Ok(Self {
            data: Arc::new(snapshot.data.into_iter().collect()),
            chat_history: Arc::new(RwLock::new(snapshot.chat_history)),
        })
    }
}
