//! SQLite-backed [`SessionStorage`]. Each conversation is one row keyed by
//! session id; the context (values + chat history) is stored as JSON text.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::{
    Context,
    error::{GraphError, Result},
    storage::{Session, SessionStorage},
};

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS flow_sessions (
    id TEXT PRIMARY KEY NOT NULL,
    graph_id TEXT NOT NULL,
    current_task_id TEXT NOT NULL,
    status_message TEXT,
    context TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
)
"#;

pub struct SqliteSessionStorage {
    pool: SqlitePool,
}

impl SqliteSessionStorage {
    /// Reuse an existing pool, e.g. the application's main database, and make
    /// sure the sessions table exists.
    pub async fn new(pool: SqlitePool) -> Result<Self> {
        sqlx::query(CREATE_TABLE)
            .execute(&pool)
            .await
            .map_err(storage_error)?;
        Ok(Self { pool })
    }
}

fn storage_error(e: impl std::fmt::Display) -> GraphError {
    GraphError::StorageError(e.to_string())
}

#[async_trait]
impl SessionStorage for SqliteSessionStorage {
    async fn save(&self, session: Session) -> Result<()> {
        let context = serde_json::to_string(&session.context).map_err(storage_error)?;

        sqlx::query(
            r#"
            INSERT INTO flow_sessions (id, graph_id, current_task_id, status_message, context)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                graph_id = excluded.graph_id,
                current_task_id = excluded.current_task_id,
                status_message = excluded.status_message,
                context = excluded.context,
                updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
            "#,
        )
        .bind(&session.id)
        .bind(&session.graph_id)
        .bind(&session.current_task_id)
        .bind(&session.status_message)
        .bind(context)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        debug!(session_id = %session.id, task = %session.current_task_id, "Session saved");
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Session>> {
        let row = sqlx::query(
            "SELECT id, graph_id, current_task_id, status_message, context FROM flow_sessions WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let context_json: String = row.try_get("context").map_err(storage_error)?;
        let context: Context = serde_json::from_str(&context_json).map_err(storage_error)?;

        Ok(Some(Session {
            id: row.try_get("id").map_err(storage_error)?,
            graph_id: row.try_get("graph_id").map_err(storage_error)?,
            current_task_id: row.try_get("current_task_id").map_err(storage_error)?,
            status_message: row.try_get("status_message").map_err(storage_error)?,
            context,
        }))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM flow_sessions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(())
    }
}
