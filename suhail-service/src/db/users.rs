use serde::Serialize;

use super::{DbPool, RepositoryError};
use crate::auth::Role;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub manager_id: Option<i64>,
}

#[derive(Clone)]
pub struct SqlUserRepository {
    pool: DbPool,
}

impl SqlUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        username: &str,
        password_hash: &str,
        role: Role,
        manager_id: Option<i64>,
    ) -> Result<User, RepositoryError> {
        let id = sqlx::query(
            "INSERT INTO users (username, password_hash, role, manager_id) VALUES (?, ?, ?, ?)",
        )
        .bind(username)
        .bind(password_hash)
        .bind(role)
        .bind(manager_id)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert(e, &format!("user '{username}'")))?
        .last_insert_rowid();

        Ok(User {
            id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            role,
            manager_id,
        })
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>, RepositoryError> {
        Ok(sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, role, manager_id FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        Ok(sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, role, manager_id FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?)
    }

    pub async fn list_all(&self) -> Result<Vec<User>, RepositoryError> {
        Ok(sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, role, manager_id FROM users ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn list_by_role(&self, role: Role) -> Result<Vec<User>, RepositoryError> {
        Ok(sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, role, manager_id FROM users WHERE role = ? ORDER BY id",
        )
        .bind(role)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn count_by_role(&self, role: Role) -> Result<i64, RepositoryError> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = ?")
            .bind(role)
            .fetch_one(&self.pool)
            .await?)
    }

    /// Change the role and, when given, the password hash. Returns false for an unknown id.
    pub async fn update(
        &self,
        id: i64,
        role: Role,
        password_hash: Option<&str>,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET role = ?, password_hash = COALESCE(?, password_hash) WHERE id = ?",
        )
        .bind(role)
        .bind(password_hash)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&self, id: i64) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
