//! Session repository
//!
//! Database operations for signed-in sessions.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Session;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Session repository trait
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Create a new session
    async fn create(&self, session: &Session) -> Result<Session>;

    /// Get session by ID (token)
    async fn get_by_id(&self, id: &str) -> Result<Option<Session>>;

    /// Delete a session
    async fn delete(&self, id: &str) -> Result<()>;

    /// Delete all sessions for a user
    async fn delete_by_user(&self, user_id: i64) -> Result<()>;

    /// Delete expired sessions, returning how many were removed
    async fn delete_expired(&self) -> Result<i64>;
}

/// SQLx-based session repository implementation
pub struct SqlxSessionRepository {
    pool: DynDatabasePool,
}

impl SqlxSessionRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SessionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    async fn create(&self, session: &Session) -> Result<Session> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_session_sqlite(self.pool.sqlite()?, session).await,
            DatabaseDriver::Mysql => create_session_mysql(self.pool.mysql()?, session).await,
        }
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Session>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_session_by_id_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => get_session_by_id_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let result = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query("DELETE FROM sessions WHERE id = ?")
                    .bind(id)
                    .execute(self.pool.sqlite()?)
                    .await
                    .map(|_| ())
            }
            DatabaseDriver::Mysql => {
                sqlx::query("DELETE FROM sessions WHERE id = ?")
                    .bind(id)
                    .execute(self.pool.mysql()?)
                    .await
                    .map(|_| ())
            }
        };
        result.context("Failed to delete session")
    }

    async fn delete_by_user(&self, user_id: i64) -> Result<()> {
        let result = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query("DELETE FROM sessions WHERE user_id = ?")
                    .bind(user_id)
                    .execute(self.pool.sqlite()?)
                    .await
                    .map(|_| ())
            }
            DatabaseDriver::Mysql => {
                sqlx::query("DELETE FROM sessions WHERE user_id = ?")
                    .bind(user_id)
                    .execute(self.pool.mysql()?)
                    .await
                    .map(|_| ())
            }
        };
        result.context("Failed to delete user sessions")
    }

    async fn delete_expired(&self) -> Result<i64> {
        let now = Utc::now();
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
                    .bind(now)
                    .execute(self.pool.sqlite()?)
                    .await
                    .map(|r| r.rows_affected())
            }
            DatabaseDriver::Mysql => {
                sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
                    .bind(now)
                    .execute(self.pool.mysql()?)
                    .await
                    .map(|r| r.rows_affected())
            }
        }
        .context("Failed to delete expired sessions")?;
        Ok(affected as i64)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_session_sqlite(pool: &SqlitePool, session: &Session) -> Result<Session> {
    sqlx::query(
        r#"
        INSERT INTO sessions (id, user_id, expires_at, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&session.id)
    .bind(session.user_id)
    .bind(session.expires_at)
    .bind(session.created_at)
    .execute(pool)
    .await
    .context("Failed to create session")?;

    Ok(session.clone())
}

async fn get_session_by_id_sqlite(pool: &SqlitePool, id: &str) -> Result<Option<Session>> {
    let row = sqlx::query("SELECT id, user_id, expires_at, created_at FROM sessions WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get session by ID")?;

    Ok(row.map(|row| Session {
        id: row.get("id"),
        user_id: row.get("user_id"),
        expires_at: row.get("expires_at"),
        created_at: row.get("created_at"),
    }))
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_session_mysql(pool: &MySqlPool, session: &Session) -> Result<Session> {
    sqlx::query(
        r#"
        INSERT INTO sessions (id, user_id, expires_at, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&session.id)
    .bind(session.user_id)
    .bind(session.expires_at)
    .bind(session.created_at)
    .execute(pool)
    .await
    .context("Failed to create session")?;

    Ok(session.clone())
}

async fn get_session_by_id_mysql(pool: &MySqlPool, id: &str) -> Result<Option<Session>> {
    let row = sqlx::query("SELECT id, user_id, expires_at, created_at FROM sessions WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get session by ID")?;

    Ok(row.map(|row| Session {
        id: row.get("id"),
        user_id: row.get("user_id"),
        expires_at: row.get("expires_at"),
        created_at: row.get("created_at"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{User, UserRole};
    use chrono::Duration;

    async fn setup() -> (SqlxSessionRepository, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let user = SqlxUserRepository::new(pool.clone())
            .create(&User::new(
                "maker".to_string(),
                "maker@example.com".to_string(),
                "hash".to_string(),
                UserRole::Member,
            ))
            .await
            .expect("Failed to create user");
        (SqlxSessionRepository::new(pool), user.id)
    }

    fn session(id: &str, user_id: i64, ttl: Duration) -> Session {
        let now = Utc::now();
        Session {
            id: id.to_string(),
            user_id,
            expires_at: now + ttl,
            created_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_get_delete_session() {
        let (repo, user_id) = setup().await;
        repo.create(&session("token-1", user_id, Duration::days(1)))
            .await
            .expect("Failed to create session");

        let found = repo.get_by_id("token-1").await.unwrap().unwrap();
        assert_eq!(found.user_id, user_id);
        assert!(!found.is_expired());

        repo.delete("token-1").await.unwrap();
        assert!(repo.get_by_id("token-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_by_user() {
        let (repo, user_id) = setup().await;
        repo.create(&session("a", user_id, Duration::days(1)))
            .await
            .unwrap();
        repo.create(&session("b", user_id, Duration::days(1)))
            .await
            .unwrap();

        repo.delete_by_user(user_id).await.unwrap();
        assert!(repo.get_by_id("a").await.unwrap().is_none());
        assert!(repo.get_by_id("b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_expired() {
        let (repo, user_id) = setup().await;
        repo.create(&session("old", user_id, -Duration::hours(1)))
            .await
            .unwrap();
        repo.create(&session("fresh", user_id, Duration::hours(1)))
            .await
            .unwrap();

        assert_eq!(repo.delete_expired().await.unwrap(), 1);
        assert!(repo.get_by_id("fresh").await.unwrap().is_some());
    }
}
