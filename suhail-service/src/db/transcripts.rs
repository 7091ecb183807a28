use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{DbPool, RepositoryError};

pub const DEFAULT_TRANSCRIPT_TITLE: &str = "Untitled Meeting";

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Transcript {
    pub id: i64,
    pub user_id: i64,
    pub chat_id: Option<String>,
    pub title: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub file_path: Option<String>,
    pub speakers_count: Option<i64>,
    pub language: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewTranscript {
    pub user_id: i64,
    pub chat_id: Option<String>,
    pub title: String,
    pub text: String,
    pub file_path: Option<String>,
    pub speakers_count: Option<i64>,
    pub language: Option<String>,
}

#[derive(Clone)]
pub struct SqlTranscriptRepository {
    pool: DbPool,
}

impl SqlTranscriptRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, new: NewTranscript) -> Result<Transcript, RepositoryError> {
        let created_at = Utc::now();
        let id = sqlx::query(
            r#"
            INSERT INTO transcripts (user_id, chat_id, title, text, created_at, file_path, speakers_count, language)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new.user_id)
        .bind(&new.chat_id)
        .bind(&new.title)
        .bind(&new.text)
        .bind(created_at)
        .bind(&new.file_path)
        .bind(new.speakers_count)
        .bind(&new.language)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(Transcript {
            id,
            user_id: new.user_id,
            chat_id: new.chat_id,
            title: new.title,
            text: new.text,
            created_at,
            file_path: new.file_path,
            speakers_count: new.speakers_count,
            language: new.language,
        })
    }

    /// A user's transcripts, newest first.
    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<Transcript>, RepositoryError> {
        Ok(sqlx::query_as::<_, Transcript>(
            r#"
            SELECT id, user_id, chat_id, title, text, created_at, file_path, speakers_count, language
            FROM transcripts WHERE user_id = ? ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn find_for_user(&self, id: i64, user_id: i64) -> Result<Option<Transcript>, RepositoryError> {
        Ok(sqlx::query_as::<_, Transcript>(
            r#"
            SELECT id, user_id, chat_id, title, text, created_at, file_path, speakers_count, language
            FROM transcripts WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    pub async fn delete(&self, id: i64, user_id: i64) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM transcripts WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
