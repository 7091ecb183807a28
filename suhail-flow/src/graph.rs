use dashmap::DashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

use crate::{
    context::Context,
    error::{GraphError, Result},
    storage::Session,
    task::{NextAction, Task, TaskResult},
};

/// Type alias for edge condition functions
pub type EdgeCondition = Arc<dyn Fn(&Context) -> bool + Send + Sync>;

/// Edge between tasks in the graph. A conditional edge goes to `to` when
/// the condition holds and to `otherwise` when it does not.
#[derive(Clone)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub condition: Option<EdgeCondition>,
    pub otherwise: Option<String>,
}

/// A graph of tasks that can be executed
pub struct Graph {
    pub id: String,
    tasks: DashMap<String, Arc<dyn Task>>,
    edges: RwLock<Vec<Edge>>,
    start_task_id: RwLock<Option<String>>,
}

impl Graph {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tasks: DashMap::new(),
            edges: RwLock::new(Vec::new()),
            start_task_id: RwLock::new(None),
        }
    }

    /// Add a task to the graph; the first task added becomes the start task
    pub fn add_task(&self, task: Arc<dyn Task>) -> &Self {
        let task_id = task.id().to_string();
        let is_first = self.tasks.is_empty();
        self.tasks.insert(task_id.clone(), task);

        if is_first {
            *self.start_task_id.write().unwrap_or_else(PoisonError::into_inner) = Some(task_id);
        }

        self
    }

    pub fn set_start_task(&self, task_id: impl Into<String>) -> &Self {
        let task_id = task_id.into();
        if self.tasks.contains_key(&task_id) {
            *self.start_task_id.write().unwrap_or_else(PoisonError::into_inner) = Some(task_id);
        }
        self
    }

    pub fn add_edge(&self, from: impl Into<String>, to: impl Into<String>) -> &Self {
        self.edges
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Edge {
                from: from.into(),
                to: to.into(),
                condition: None,
                otherwise: None,
            });
        self
    }

    /// Add a binary branch: `yes` when `condition` holds, `no` otherwise.
    pub fn add_conditional_edge<F>(
        &self,
        from: impl Into<String>,
        condition: F,
        yes: impl Into<String>,
        no: impl Into<String>,
    ) -> &Self
    where
        F: Fn(&Context) -> bool + Send + Sync + 'static,
    {
        self.edges
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Edge {
                from: from.into(),
                to: yes.into(),
                condition: Some(Arc::new(condition)),
                otherwise: Some(no.into()),
            });
        self
    }

    /// Add an edge taken only when `condition` holds. Several of these from
    /// one task form a multi-way branch.
    pub fn add_edge_when<F>(&self, from: impl Into<String>, condition: F, to: impl Into<String>) -> &Self
    where
        F: Fn(&Context) -> bool + Send + Sync + 'static,
    {
        self.edges
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Edge {
                from: from.into(),
                to: to.into(),
                condition: Some(Arc::new(condition)),
                otherwise: None,
            });
        self
    }

    /// Run the session's current task, then move the session cursor
    /// according to the task's `NextAction`. `ContinueAndExecute` keeps
    /// running within the same call.
    pub async fn execute_session(&self, session: &mut Session) -> Result<ExecutionResult> {
        let result = self
            .execute_single_task(&session.current_task_id, session.context.clone())
            .await?;

        session.status_message = result.status_message.clone();

        match &result.next_action {
            NextAction::Continue => {
                session.current_task_id = self
                    .find_next_task(&result.task_id, &session.context)
                    .unwrap_or_else(|| result.task_id.clone());
                Ok(ExecutionResult {
                    response: result.response,
                    status: ExecutionStatus::WaitingForInput,
                })
            }
            NextAction::ContinueAndExecute => {
                match self.find_next_task(&result.task_id, &session.context) {
                    Some(next_task_id) => {
                        debug!(from = %result.task_id, to = %next_task_id, "Cascading into next task");
                        session.current_task_id = next_task_id;
                        Box::pin(self.execute_session(session)).await
                    }
                    None => {
                        session.current_task_id = result.task_id.clone();
                        Ok(ExecutionResult {
                            response: result.response,
                            status: ExecutionStatus::WaitingForInput,
                        })
                    }
                }
            }
            NextAction::WaitForInput => {
                session.current_task_id = result.task_id.clone();
                Ok(ExecutionResult {
                    response: result.response,
                    status: ExecutionStatus::WaitingForInput,
                })
            }
            NextAction::End => {
                session.current_task_id = result.task_id.clone();
                Ok(ExecutionResult {
                    response: result.response,
                    status: ExecutionStatus::Completed,
                })
            }
            NextAction::GoTo(target_id) => {
                if !self.tasks.contains_key(target_id) {
                    return Err(GraphError::TaskNotFound(target_id.clone()));
                }
                session.current_task_id = target_id.clone();
                Ok(ExecutionResult {
                    response: result.response,
                    status: ExecutionStatus::WaitingForInput,
                })
            }
        }
    }

    async fn execute_single_task(&self, task_id: &str, context: Context) -> Result<TaskResult> {
        let task = self
            .get_task(task_id)
            .ok_or_else(|| GraphError::TaskNotFound(task_id.to_string()))?;

        let mut result = task.run(context).await?;
        result.task_id = task_id.to_string();
        Ok(result)
    }

    /// First matching outgoing edge wins. A binary branch always matches,
    /// taking its `otherwise` side when the condition is false; an
    /// `add_edge_when` edge is skipped instead.
    pub fn find_next_task(&self, current_task_id: &str, context: &Context) -> Option<String> {
        let edges = self.edges.read().unwrap_or_else(PoisonError::into_inner);

        edges
            .iter()
            .filter(|edge| edge.from == current_task_id)
            .find_map(|edge| match &edge.condition {
                Some(condition) if condition(context) => Some(edge.to.clone()),
                Some(_) => edge.otherwise.clone(),
                None => Some(edge.to.clone()),
            })
    }

    pub fn start_task_id(&self) -> Option<String> {
        self.start_task_id
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn get_task(&self, task_id: &str) -> Option<Arc<dyn Task>> {
        self.tasks.get(task_id).map(|entry| entry.clone())
    }
}

/// Builder for creating graphs
pub struct GraphBuilder {
    graph: Graph,
}

impl GraphBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            graph: Graph::new(id),
        }
    }

    pub fn add_task(self, task: Arc<dyn Task>) -> Self {
        self.graph.add_task(task);
        self
    }

    pub fn add_edge(self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.graph.add_edge(from, to);
        self
    }

    pub fn add_conditional_edge<F>(
        self,
        from: impl Into<String>,
        condition: F,
        yes: impl Into<String>,
        no: impl Into<String>,
    ) -> Self
    where
        F: Fn(&Context) -> bool + Send + Sync + 'static,
    {
        self.graph.add_conditional_edge(from, condition, yes, no);
        self
    }

    pub fn add_edge_when<F>(self, from: impl Into<String>, condition: F, to: impl Into<String>) -> Self
    where
        F: Fn(&Context) -> bool + Send + Sync + 'static,
    {
        self.graph.add_edge_when(from, condition, to);
        self
    }

    pub fn set_start_task(self, task_id: impl Into<String>) -> Self {
        self.graph.set_start_task(task_id);
        self
    }

    pub fn build(self) -> Graph {
        self.graph
    }
}

/// Outcome of one `execute_session` call
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub response: Option<String>,
    pub status: ExecutionStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionStatus {
    /// Waiting for user input to continue
    WaitingForInput,
    /// Workflow completed successfully
    Completed,
}
