use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{DbPool, RepositoryError};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ClientSummary {
    pub id: i64,
    pub user_id: i64,
    pub client_name: String,
    pub summary: String,
    pub last_updated: DateTime<Utc>,
    pub message_count: i64,
}

#[derive(Clone)]
pub struct SqlSummaryRepository {
    pool: DbPool,
}

impl SqlSummaryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<ClientSummary>, RepositoryError> {
        Ok(sqlx::query_as::<_, ClientSummary>(
            "SELECT id, user_id, client_name, summary, last_updated, message_count FROM client_summaries WHERE user_id = ? ORDER BY client_name",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn find(&self, user_id: i64, client_name: &str) -> Result<Option<ClientSummary>, RepositoryError> {
        Ok(sqlx::query_as::<_, ClientSummary>(
            "SELECT id, user_id, client_name, summary, last_updated, message_count FROM client_summaries WHERE user_id = ? AND client_name = ?",
        )
        .bind(user_id)
        .bind(client_name)
        .fetch_optional(&self.pool)
        .await?)
    }

    /// Insert or replace the summary kept for one of a user's clients.
    pub async fn upsert(
        &self,
        user_id: i64,
        client_name: &str,
        summary: &str,
        message_count: i64,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO client_summaries (user_id, client_name, summary, last_updated, message_count)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(user_id, client_name) DO UPDATE SET
                summary = excluded.summary,
                last_updated = excluded.last_updated,
                message_count = excluded.message_count
            "#,
        )
        .bind(user_id)
        .bind(client_name)
        .bind(summary)
        .bind(Utc::now())
        .bind(message_count)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
