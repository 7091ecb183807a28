//! SQLite persistence: pool set-up, embedded migrations and one repository
//! per table family.

use std::time::Duration;

use sqlx::{
    migrate::{MigrateError, Migrator},
    sqlite::SqlitePoolOptions,
};
use thiserror::Error;

pub mod chats;
pub mod notifications;
pub mod summaries;
pub mod transcripts;
pub mod users;

pub use chats::{ChatMessage, ChatSession, RecentChat, Sender, SqlChatRepository};
pub use notifications::{NotificationPriority, SqlNotificationRepository, TeamNotification};
pub use summaries::{ClientSummary, SqlSummaryRepository};
pub use transcripts::{NewTranscript, SqlTranscriptRepository, Transcript};
pub use users::{SqlUserRepository, User};

pub type DbPool = sqlx::SqlitePool;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("decode error: {0}")]
    Decode(String),
}

impl RepositoryError {
    /// Map a unique-constraint violation to `Conflict`, leave anything else as is.
    pub(crate) fn from_insert(error: sqlx::Error, what: &str) -> Self {
        match error.as_database_error() {
            Some(db_error) if db_error.is_unique_violation() => {
                RepositoryError::Conflict(format!("{what} already exists"))
            }
            _ => RepositoryError::Database(error),
        }
    }
}

pub async fn connect(database_url: &str) -> Result<DbPool, sqlx::Error> {
    connect_with_settings(database_url, 5, 30).await
}

pub async fn connect_with_settings(
    database_url: &str,
    max_connections: u32,
    timeout_secs: u64,
) -> Result<DbPool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(Duration::from_secs(timeout_secs.max(1)))
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *conn).await?;
                sqlx::query("PRAGMA journal_mode = WAL").execute(&mut *conn).await?;
                sqlx::query("PRAGMA busy_timeout = 5000").execute(&mut *conn).await?;
                Ok(())
            })
        })
        .connect(database_url)
        .await
}

/// A private in-memory database. Every in-memory connection is its own
/// database, so the pool holds exactly one connection that never expires.
pub async fn connect_in_memory() -> Result<DbPool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *conn).await?;
                Ok(())
            })
        })
        .connect("sqlite::memory:")
        .await
}

pub async fn run_migrations(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

#[cfg(test)]
pub(crate) async fn test_pool() -> DbPool {
    let pool = connect_in_memory().await.unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}
