use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DbPool, RepositoryError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum NotificationPriority {
    #[serde(rename = "Internal Announcement")]
    #[sqlx(rename = "Internal Announcement")]
    InternalAnnouncement,
    #[serde(rename = "External Broadcast For Clients")]
    #[sqlx(rename = "External Broadcast For Clients")]
    ExternalBroadcast,
    #[default]
    #[serde(rename = "General Notes")]
    #[sqlx(rename = "General Notes")]
    GeneralNotes,
}

impl NotificationPriority {
    pub fn label(self) -> &'static str {
        match self {
            NotificationPriority::InternalAnnouncement => "Internal Announcement",
            NotificationPriority::ExternalBroadcast => "External Broadcast For Clients",
            NotificationPriority::GeneralNotes => "General Notes",
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TeamNotification {
    pub id: i64,
    pub manager_id: i64,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub is_active: bool,
    pub priority: NotificationPriority,
}

#[derive(Clone)]
pub struct SqlNotificationRepository {
    pool: DbPool,
}

impl SqlNotificationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        manager_id: i64,
        message: &str,
        priority: NotificationPriority,
    ) -> Result<TeamNotification, RepositoryError> {
        let timestamp = Utc::now();
        let id = sqlx::query(
            "INSERT INTO team_notifications (manager_id, message, timestamp, is_active, priority) VALUES (?, ?, ?, 1, ?)",
        )
        .bind(manager_id)
        .bind(message)
        .bind(timestamp)
        .bind(priority)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(TeamNotification {
            id,
            manager_id,
            message: message.to_string(),
            timestamp,
            is_active: true,
            priority,
        })
    }

    /// Active notifications the user has not read: Internal, then External,
    /// then General, newest first within a priority.
    pub async fn unread_for_user(&self, user_id: i64) -> Result<Vec<TeamNotification>, RepositoryError> {
        Ok(sqlx::query_as::<_, TeamNotification>(
            r#"
            SELECT n.id, n.manager_id, n.message, n.timestamp, n.is_active, n.priority
            FROM team_notifications n
            WHERE n.is_active = 1
              AND n.id NOT IN (SELECT notification_id FROM notification_reads WHERE user_id = ?)
            ORDER BY
                CASE n.priority
                    WHEN 'Internal Announcement' THEN 1
                    WHEN 'External Broadcast For Clients' THEN 2
                    ELSE 3
                END,
                n.timestamp DESC,
                n.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    /// Record that the user read a notification. Returns false for an unknown notification.
    pub async fn mark_read(&self, notification_id: i64, user_id: i64) -> Result<bool, RepositoryError> {
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM team_notifications WHERE id = ?")
            .bind(notification_id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Ok(false);
        }

        sqlx::query(
            "INSERT OR IGNORE INTO notification_reads (notification_id, user_id, read_at) VALUES (?, ?, ?)",
        )
        .bind(notification_id)
        .bind(user_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::Role,
        db::{SqlUserRepository, test_pool},
    };

    #[tokio::test]
    async fn unread_is_ordered_by_priority_and_excludes_read() {
        let pool = test_pool().await;
        let users = SqlUserRepository::new(pool.clone());
        let manager = users.create("manager", "h", Role::Manager, None).await.unwrap();
        let agent = users.create("agent", "h", Role::SalesAgent, None).await.unwrap();
        let repo = SqlNotificationRepository::new(pool);

        let general = repo
            .create(manager.id, "Team lunch", NotificationPriority::GeneralNotes)
            .await
            .unwrap();
        let external = repo
            .create(manager.id, "New Gold brochure", NotificationPriority::ExternalBroadcast)
            .await
            .unwrap();
        let internal = repo
            .create(manager.id, "Quota review", NotificationPriority::InternalAnnouncement)
            .await
            .unwrap();

        let unread = repo.unread_for_user(agent.id).await.unwrap();
        assert_eq!(
            unread.iter().map(|n| n.id).collect::<Vec<_>>(),
            [internal.id, external.id, general.id]
        );

        assert!(repo.mark_read(internal.id, agent.id).await.unwrap());
        assert!(repo.mark_read(internal.id, agent.id).await.unwrap());
        assert!(!repo.mark_read(9999, agent.id).await.unwrap());

        let unread = repo.unread_for_user(agent.id).await.unwrap();
        assert_eq!(unread.len(), 2);
        assert_eq!(repo.unread_for_user(manager.id).await.unwrap().len(), 3);
    }
}
