//! `FlowRunner`: load a session, execute exactly **one** graph step, and
//! persist the updated session back to storage.
//!
//! Web handlers use it for the load → execute → save round trip of a single
//! chat message. Call `Graph::execute_session` directly when several steps
//! must run before one save.

use std::sync::Arc;

use crate::{
    context::Context,
    error::{GraphError, Result},
    graph::{ExecutionResult, Graph},
    storage::{Session, SessionStorage},
};

#[derive(Clone)]
pub struct FlowRunner {
    graph: Arc<Graph>,
    storage: Arc<dyn SessionStorage>,
    max_chat_messages: Option<usize>,
}

impl FlowRunner {
    pub fn new(graph: Arc<Graph>, storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            graph,
            storage,
            max_chat_messages: None,
        }
    }

    /// Cap the chat history of sessions this runner starts. The cap is
    /// persisted with the session.
    pub fn with_max_chat_messages(mut self, max: usize) -> Self {
        self.max_chat_messages = Some(max);
        self
    }

    pub fn graph(&self) -> &Arc<Graph> {
        &self.graph
    }

    pub fn storage(&self) -> &Arc<dyn SessionStorage> {
        &self.storage
    }

    /// Execute one step for an already loaded (or freshly created) session
    /// and save it, so callers can prime the context first.
    pub async fn run_session(&self, mut session: Session) -> Result<ExecutionResult> {
        let result = self.graph.execute_session(&mut session).await?;
        self.storage.save(session).await?;
        Ok(result)
    }

    /// Load the session with this id, or start a new one at the graph's
    /// start task.
    pub async fn load_or_start(&self, session_id: &str) -> Result<(Session, bool)> {
        if let Some(session) = self.storage.get(session_id).await? {
            return Ok((session, false));
        }

        let start = self
            .graph
            .start_task_id()
            .ok_or_else(|| GraphError::TaskNotFound("start task".to_string()))?;
        let mut session = Session::new_from_task(session_id.to_string(), &start).with_graph(self.graph.id.clone());
        if let Some(max) = self.max_chat_messages {
            session.context = Context::with_max_chat_messages(max);
        }
        Ok((session, true))
    }
}
