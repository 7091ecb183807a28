use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DbPool, RepositoryError};
use crate::auth::Role;

pub const DEFAULT_CHAT_TITLE: &str = "Untitled Chat";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// A conversation. One with a `client_name` is a client chat.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ChatSession {
    pub id: String,
    pub user_id: i64,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub client_name: Option<String>,
}

impl ChatSession {
    pub fn is_client_chat(&self) -> bool {
        self.client_name
            .as_deref()
            .is_some_and(|name| !name.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ChatMessage {
    pub id: i64,
    pub session_id: String,
    pub user_id: i64,
    pub message: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RecentChat {
    pub id: String,
    pub title: String,
    pub last_message_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SqlChatRepository {
    pool: DbPool,
}

impl SqlChatRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        user_id: i64,
        title: &str,
        client_name: Option<&str>,
    ) -> Result<ChatSession, RepositoryError> {
        let chat = ChatSession {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            title: title.to_string(),
            created_at: Utc::now(),
            client_name: client_name.map(str::to_string),
        };

        sqlx::query(
            "INSERT INTO chat_sessions (id, user_id, title, created_at, client_name) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&chat.id)
        .bind(chat.user_id)
        .bind(&chat.title)
        .bind(chat.created_at)
        .bind(&chat.client_name)
        .execute(&self.pool)
        .await?;

        Ok(chat)
    }

    pub async fn find_for_user(
        &self,
        chat_id: &str,
        user_id: i64,
    ) -> Result<Option<ChatSession>, RepositoryError> {
        Ok(sqlx::query_as::<_, ChatSession>(
            "SELECT id, user_id, title, created_at, client_name FROM chat_sessions WHERE id = ? AND user_id = ?",
        )
        .bind(chat_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    /// All chats of a user, newest first.
    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<ChatSession>, RepositoryError> {
        Ok(sqlx::query_as::<_, ChatSession>(
            "SELECT id, user_id, title, created_at, client_name FROM chat_sessions WHERE user_id = ? ORDER BY created_at DESC, rowid DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    /// General (non-client) chats that have messages, most recently active first.
    pub async fn recent_general(&self, user_id: i64) -> Result<Vec<RecentChat>, RepositoryError> {
        Ok(sqlx::query_as::<_, RecentChat>(
            r#"
            SELECT s.id AS id, s.title AS title, MAX(m.timestamp) AS last_message_at
            FROM chat_sessions s
            JOIN chat_messages m ON m.session_id = s.id
            WHERE s.user_id = ? AND s.client_name IS NULL
            GROUP BY s.id, s.title
            ORDER BY last_message_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    /// Newest chat of a user with exactly this title.
    pub async fn latest_with_title(
        &self,
        user_id: i64,
        title: &str,
    ) -> Result<Option<ChatSession>, RepositoryError> {
        Ok(sqlx::query_as::<_, ChatSession>(
            "SELECT id, user_id, title, created_at, client_name FROM chat_sessions WHERE user_id = ? AND title = ? ORDER BY created_at DESC, rowid DESC LIMIT 1",
        )
        .bind(user_id)
        .bind(title)
        .fetch_optional(&self.pool)
        .await?)
    }

    pub async fn rename(&self, chat_id: &str, user_id: i64, title: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE chat_sessions SET title = ? WHERE id = ? AND user_id = ?")
            .bind(title)
            .bind(chat_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a chat and its messages. Returns false when the user owns no such chat.
    pub async fn delete(&self, chat_id: &str, user_id: i64) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let owned: Option<String> =
            sqlx::query_scalar("SELECT id FROM chat_sessions WHERE id = ? AND user_id = ?")
                .bind(chat_id)
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;
        if owned.is_none() {
            return Ok(false);
        }

        sqlx::query("DELETE FROM chat_messages WHERE session_id = ?")
            .bind(chat_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM chat_sessions WHERE id = ?")
            .bind(chat_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    pub async fn add_message(
        &self,
        session_id: &str,
        user_id: i64,
        message: &str,
        sender: Sender,
    ) -> Result<ChatMessage, RepositoryError> {
        let timestamp = Utc::now();
        let id = sqlx::query(
            "INSERT INTO chat_messages (session_id, user_id, message, sender, timestamp) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(session_id)
        .bind(user_id)
        .bind(message)
        .bind(sender)
        .bind(timestamp)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(ChatMessage {
            id,
            session_id: session_id.to_string(),
            user_id,
            message: message.to_string(),
            sender,
            timestamp,
        })
    }

    /// Store a completed turn: the user's message, asked at `asked_at`, and
    /// the reply, together or not at all.
    pub async fn add_exchange(
        &self,
        session_id: &str,
        user_id: i64,
        asked_at: DateTime<Utc>,
        user_message: &str,
        reply: &str,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        for (message, sender, timestamp) in [
            (user_message, Sender::User, asked_at),
            (reply, Sender::Bot, Utc::now().max(asked_at)),
        ] {
            sqlx::query(
                "INSERT INTO chat_messages (session_id, user_id, message, sender, timestamp) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(session_id)
            .bind(user_id)
            .bind(message)
            .bind(sender)
            .bind(timestamp)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Messages of a chat in chronological order.
    pub async fn messages(&self, session_id: &str) -> Result<Vec<ChatMessage>, RepositoryError> {
        Ok(sqlx::query_as::<_, ChatMessage>(
            "SELECT id, session_id, user_id, message, sender, timestamp FROM chat_messages WHERE session_id = ? ORDER BY timestamp, id",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?)
    }

    /// The last `limit` messages of a chat, returned oldest first.
    pub async fn recent_messages(
        &self,
        session_id: &str,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let mut messages = sqlx::query_as::<_, ChatMessage>(
            "SELECT id, session_id, user_id, message, sender, timestamp FROM chat_messages WHERE session_id = ? ORDER BY timestamp DESC, id DESC LIMIT ?",
        )
        .bind(session_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        messages.reverse();
        Ok(messages)
    }

    pub async fn first_message(&self, session_id: &str) -> Result<Option<ChatMessage>, RepositoryError> {
        Ok(sqlx::query_as::<_, ChatMessage>(
            "SELECT id, session_id, user_id, message, sender, timestamp FROM chat_messages WHERE session_id = ? ORDER BY timestamp, id LIMIT 1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    pub async fn count_messages(&self, session_id: &str) -> Result<i64, RepositoryError> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM chat_messages WHERE session_id = ?")
            .bind(session_id)
            .fetch_one(&self.pool)
            .await?)
    }

    /// Distinct, non-blank client names of a user.
    pub async fn client_names(&self, user_id: i64) -> Result<Vec<String>, RepositoryError> {
        Ok(sqlx::query_scalar(
            "SELECT DISTINCT client_name FROM chat_sessions WHERE user_id = ? AND client_name IS NOT NULL AND TRIM(client_name) != '' ORDER BY client_name",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    /// Distinct, non-blank client names across all users holding `role`.
    pub async fn client_names_for_role(&self, role: Role) -> Result<Vec<String>, RepositoryError> {
        Ok(sqlx::query_scalar(
            r#"
            SELECT DISTINCT s.client_name
            FROM chat_sessions s
            JOIN users u ON u.id = s.user_id
            WHERE u.role = ? AND s.client_name IS NOT NULL AND TRIM(s.client_name) != ''
            ORDER BY s.client_name
            "#,
        )
        .bind(role)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn find_client_chat(
        &self,
        user_id: i64,
        client_name: &str,
    ) -> Result<Option<ChatSession>, RepositoryError> {
        Ok(sqlx::query_as::<_, ChatSession>(
            "SELECT id, user_id, title, created_at, client_name FROM chat_sessions WHERE user_id = ? AND client_name = ? ORDER BY created_at, rowid LIMIT 1",
        )
        .bind(user_id)
        .bind(client_name)
        .fetch_optional(&self.pool)
        .await?)
    }

    /// Chat ids of every chat held for a client, so callers can drop related state.
    pub async fn client_chat_ids(&self, user_id: i64, client_name: &str) -> Result<Vec<String>, RepositoryError> {
        Ok(sqlx::query_scalar("SELECT id FROM chat_sessions WHERE user_id = ? AND client_name = ?")
            .bind(user_id)
            .bind(client_name)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Delete every chat held for a client. Returns the number of chats removed.
    pub async fn delete_client(&self, user_id: i64, client_name: &str) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "DELETE FROM chat_messages WHERE session_id IN (SELECT id FROM chat_sessions WHERE user_id = ? AND client_name = ?)",
        )
        .bind(user_id)
        .bind(client_name)
        .execute(&mut *tx)
        .await?;

        let deleted = sqlx::query("DELETE FROM chat_sessions WHERE user_id = ? AND client_name = ?")
            .bind(user_id)
            .bind(client_name)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(deleted)
    }

    pub async fn rename_client(
        &self,
        user_id: i64,
        old_name: &str,
        new_name: &str,
    ) -> Result<u64, RepositoryError> {
        let result =
            sqlx::query("UPDATE chat_sessions SET client_name = ? WHERE user_id = ? AND client_name = ?")
                .bind(new_name)
                .bind(user_id)
                .bind(old_name)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{SqlUserRepository, test_pool};

    async fn setup() -> (SqlChatRepository, i64) {
        let pool = test_pool().await;
        let user = SqlUserRepository::new(pool.clone())
            .create("ahmed", "h", Role::SalesAgent, None)
            .await
            .unwrap();
        (SqlChatRepository::new(pool), user.id)
    }

    #[tokio::test]
    async fn exchange_stores_question_then_reply() {
        let (repo, user_id) = setup().await;
        let chat = repo.create(user_id, DEFAULT_CHAT_TITLE, None).await.unwrap();

        repo.add_exchange(&chat.id, user_id, Utc::now(), "hi", "hello").await.unwrap();

        let all = repo.messages(&chat.id).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!((all[0].message.as_str(), all[0].sender), ("hi", Sender::User));
        assert_eq!((all[1].message.as_str(), all[1].sender), ("hello", Sender::Bot));
    }

    #[tokio::test]
    async fn messages_come_back_in_order() {
        let (repo, user_id) = setup().await;
        let chat = repo.create(user_id, DEFAULT_CHAT_TITLE, None).await.unwrap();

        for (i, sender) in [Sender::User, Sender::Bot, Sender::User].into_iter().enumerate() {
            repo.add_message(&chat.id, user_id, &format!("m{i}"), sender).await.unwrap();
        }

        let all = repo.messages(&chat.id).await.unwrap();
        assert_eq!(all.iter().map(|m| m.message.as_str()).collect::<Vec<_>>(), ["m0", "m1", "m2"]);

        let recent = repo.recent_messages(&chat.id, 2).await.unwrap();
        assert_eq!(recent.iter().map(|m| m.message.as_str()).collect::<Vec<_>>(), ["m1", "m2"]);

        assert_eq!(repo.count_messages(&chat.id).await.unwrap(), 3);
        assert_eq!(repo.first_message(&chat.id).await.unwrap().unwrap().sender, Sender::User);
    }

    #[tokio::test]
    async fn recent_general_skips_client_and_empty_chats() {
        let (repo, user_id) = setup().await;
        let general = repo.create(user_id, "General", None).await.unwrap();
        let client = repo.create(user_id, "Chat with Acme", Some("Acme")).await.unwrap();
        repo.create(user_id, "Empty", None).await.unwrap();

        repo.add_message(&general.id, user_id, "hello", Sender::User).await.unwrap();
        repo.add_message(&client.id, user_id, "hello", Sender::User).await.unwrap();

        let recent = repo.recent_general(user_id).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, general.id);
    }

    #[tokio::test]
    async fn delete_is_scoped_to_owner() {
        let (repo, user_id) = setup().await;
        let chat = repo.create(user_id, "Mine", None).await.unwrap();
        repo.add_message(&chat.id, user_id, "x", Sender::User).await.unwrap();

        assert!(!repo.delete(&chat.id, user_id + 1).await.unwrap());
        assert!(repo.delete(&chat.id, user_id).await.unwrap());
        assert_eq!(repo.count_messages(&chat.id).await.unwrap(), 0);
        assert!(repo.find_for_user(&chat.id, user_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn client_rename_and_delete() {
        let (repo, user_id) = setup().await;
        repo.create(user_id, "Chat with Acme", Some("Acme")).await.unwrap();
        repo.create(user_id, "Follow-up", Some("Acme")).await.unwrap();
        repo.create(user_id, "Chat with Zain", Some("Zain")).await.unwrap();

        assert_eq!(repo.client_names(user_id).await.unwrap(), ["Acme", "Zain"]);
        assert_eq!(repo.rename_client(user_id, "Acme", "Acme Group").await.unwrap(), 2);
        assert_eq!(repo.rename_client(user_id, "Nobody", "X").await.unwrap(), 0);
        assert!(repo.find_client_chat(user_id, "Acme Group").await.unwrap().is_some());

        assert_eq!(repo.delete_client(user_id, "Acme Group").await.unwrap(), 2);
        assert_eq!(repo.client_names(user_id).await.unwrap(), ["Zain"]);
        assert_eq!(
            repo.client_names_for_role(Role::SalesAgent).await.unwrap(),
            ["Zain"]
        );
    }
}
