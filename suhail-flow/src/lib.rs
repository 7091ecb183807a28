pub mod context;
pub mod error;
pub mod graph;
pub mod runner;
pub mod storage;
#[cfg(feature = "sqlite")]
pub mod storage_sqlite;
pub mod task;

// Re-export commonly used types
pub use context::{ChatHistory, Context, MessageRole, SerializableMessage};
#[cfg(feature = "rig")]
pub use context::to_rig_messages;
pub use error::{GraphError, Result};
pub use graph::{ExecutionResult, ExecutionStatus, Graph, GraphBuilder};
pub use runner::FlowRunner;
pub use storage::{InMemorySessionStorage, Session, SessionStorage};
#[cfg(feature = "sqlite")]
pub use storage_sqlite::SqliteSessionStorage;
pub use task::{NextAction, Task, TaskResult};
