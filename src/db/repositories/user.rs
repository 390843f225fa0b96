//! User repository
//!
//! Database operations for accounts. The four settings groups and the
//! problem settings are stored as JSON text columns.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::User;
use crate::models::UserRole;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user
    async fn create(&self, user: &User) -> Result<User>;

    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by username
    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Get user by email
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Persist every mutable column of `user`
    async fn update(&self, user: &User) -> Result<User>;

    /// Delete a user (sessions cascade)
    async fn delete(&self, id: i64) -> Result<()>;

    /// Count total users
    async fn count(&self) -> Result<i64>;
}

/// SQLx-based user repository implementation
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_user_sqlite(self.pool.sqlite()?, user).await,
            DatabaseDriver::Mysql => create_user_mysql(self.pool.mysql()?, user).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&select_where("id"))
                    .bind(id)
                    .fetch_optional(self.pool.sqlite()?)
                    .await
                    .context("Failed to get user by ID")?;
                row.as_ref().map(row_to_user_sqlite).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&select_where("id"))
                    .bind(id)
                    .fetch_optional(self.pool.mysql()?)
                    .await
                    .context("Failed to get user by ID")?;
                row.as_ref().map(row_to_user_mysql).transpose()
            }
        }
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&select_where("username"))
                    .bind(username)
                    .fetch_optional(self.pool.sqlite()?)
                    .await
                    .context("Failed to get user by username")?;
                row.as_ref().map(row_to_user_sqlite).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&select_where("username"))
                    .bind(username)
                    .fetch_optional(self.pool.mysql()?)
                    .await
                    .context("Failed to get user by username")?;
                row.as_ref().map(row_to_user_mysql).transpose()
            }
        }
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&select_where("email"))
                    .bind(email)
                    .fetch_optional(self.pool.sqlite()?)
                    .await
                    .context("Failed to get user by email")?;
                row.as_ref().map(row_to_user_sqlite).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&select_where("email"))
                    .bind(email)
                    .fetch_optional(self.pool.mysql()?)
                    .await
                    .context("Failed to get user by email")?;
                row.as_ref().map(row_to_user_mysql).transpose()
            }
        }
    }

    async fn update(&self, user: &User) -> Result<User> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_user_sqlite(self.pool.sqlite()?, user).await,
            DatabaseDriver::Mysql => update_user_mysql(self.pool.mysql()?, user).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query("DELETE FROM users WHERE id = ?")
                    .bind(id)
                    .execute(self.pool.sqlite()?)
                    .await
                    .context("Failed to delete user")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query("DELETE FROM users WHERE id = ?")
                    .bind(id)
                    .execute(self.pool.mysql()?)
                    .await
                    .context("Failed to delete user")?;
            }
        }
        Ok(())
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query_scalar("SELECT COUNT(*) FROM users")
                    .fetch_one(self.pool.sqlite()?)
                    .await
            }
            DatabaseDriver::Mysql => {
                sqlx::query_scalar("SELECT COUNT(*) FROM users")
                    .fetch_one(self.pool.mysql()?)
                    .await
            }
        }
        .context("Failed to count users")?;
        Ok(count)
    }
}

const USER_COLUMNS: &str = "id, username, email, password_hash, reset_password_token, role, \
     approved, interface_language, sensitive_content_handling, pagination_settings, \
     tag_cloud_settings, file_list_settings, renderer_settings, problem_settings, \
     created_at, updated_at";

fn select_where(column: &str) -> String {
    format!("SELECT {} FROM users WHERE {} = ?", USER_COLUMNS, column)
}

/// JSON-encoded settings columns, in storage order
struct SettingsColumns {
    pagination: Option<String>,
    tag_cloud: Option<String>,
    file_list: Option<String>,
    renderer: Option<String>,
    problem: Option<String>,
}

impl SettingsColumns {
    fn encode(user: &User) -> Result<Self> {
        Ok(Self {
            pagination: to_json(&user.pagination_settings)?,
            tag_cloud: to_json(&user.tag_cloud_settings)?,
            file_list: to_json(&user.file_list_settings)?,
            renderer: to_json(&user.renderer_settings)?,
            problem: to_json(&user.problem_settings)?,
        })
    }
}

fn to_json<T: Serialize>(value: &Option<T>) -> Result<Option<String>> {
    value
        .as_ref()
        .map(|v| serde_json::to_string(v).context("Failed to encode settings"))
        .transpose()
}

fn from_json<T: DeserializeOwned>(column: &str, raw: Option<String>) -> Result<Option<T>> {
    raw.filter(|s| !s.is_empty())
        .map(|s| {
            serde_json::from_str(&s).with_context(|| format!("Invalid JSON in users.{}", column))
        })
        .transpose()
}

fn parse_role(raw: &str) -> Result<UserRole> {
    UserRole::from_str(raw).with_context(|| format!("Invalid role in database: {}", raw))
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_user_sqlite(pool: &SqlitePool, user: &User) -> Result<User> {
    let now = Utc::now();
    let settings = SettingsColumns::encode(user)?;

    let result = sqlx::query(
        r#"
        INSERT INTO users (username, email, password_hash, reset_password_token, role, approved,
            interface_language, sensitive_content_handling, pagination_settings,
            tag_cloud_settings, file_list_settings, renderer_settings, problem_settings,
            created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.reset_password_token)
    .bind(user.role.to_string())
    .bind(user.approved)
    .bind(&user.interface_language)
    .bind(&user.sensitive_content_handling)
    .bind(&settings.pagination)
    .bind(&settings.tag_cloud)
    .bind(&settings.file_list)
    .bind(&settings.renderer)
    .bind(&settings.problem)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(User {
        id: result.last_insert_rowid(),
        created_at: now,
        updated_at: now,
        ..user.clone()
    })
}

async fn update_user_sqlite(pool: &SqlitePool, user: &User) -> Result<User> {
    let now = Utc::now();
    let settings = SettingsColumns::encode(user)?;

    sqlx::query(
        r#"
        UPDATE users
        SET username = ?, email = ?, password_hash = ?, reset_password_token = ?, role = ?,
            approved = ?, interface_language = ?, sensitive_content_handling = ?,
            pagination_settings = ?, tag_cloud_settings = ?, file_list_settings = ?,
            renderer_settings = ?, problem_settings = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.reset_password_token)
    .bind(user.role.to_string())
    .bind(user.approved)
    .bind(&user.interface_language)
    .bind(&user.sensitive_content_handling)
    .bind(&settings.pagination)
    .bind(&settings.tag_cloud)
    .bind(&settings.file_list)
    .bind(&settings.renderer)
    .bind(&settings.problem)
    .bind(now)
    .bind(user.id)
    .execute(pool)
    .await
    .context("Failed to update user")?;

    Ok(User {
        updated_at: now,
        ..user.clone()
    })
}

fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    let role: String = row.get("role");

    Ok(User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        reset_password_token: row.get("reset_password_token"),
        role: parse_role(&role)?,
        approved: row.get("approved"),
        interface_language: row.get("interface_language"),
        sensitive_content_handling: row.get("sensitive_content_handling"),
        pagination_settings: from_json("pagination_settings", row.get("pagination_settings"))?,
        tag_cloud_settings: from_json("tag_cloud_settings", row.get("tag_cloud_settings"))?,
        file_list_settings: from_json("file_list_settings", row.get("file_list_settings"))?,
        renderer_settings: from_json("renderer_settings", row.get("renderer_settings"))?,
        problem_settings: from_json("problem_settings", row.get("problem_settings"))?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_user_mysql(pool: &MySqlPool, user: &User) -> Result<User> {
    let now = Utc::now();
    let settings = SettingsColumns::encode(user)?;

    let result = sqlx::query(
        r#"
        INSERT INTO users (username, email, password_hash, reset_password_token, role, approved,
            interface_language, sensitive_content_handling, pagination_settings,
            tag_cloud_settings, file_list_settings, renderer_settings, problem_settings,
            created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.reset_password_token)
    .bind(user.role.to_string())
    .bind(user.approved)
    .bind(&user.interface_language)
    .bind(&user.sensitive_content_handling)
    .bind(&settings.pagination)
    .bind(&settings.tag_cloud)
    .bind(&settings.file_list)
    .bind(&settings.renderer)
    .bind(&settings.problem)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(User {
        id: result.last_insert_id() as i64,
        created_at: now,
        updated_at: now,
        ..user.clone()
    })
}

async fn update_user_mysql(pool: &MySqlPool, user: &User) -> Result<User> {
    let now = Utc::now();
    let settings = SettingsColumns::encode(user)?;

    sqlx::query(
        r#"
        UPDATE users
        SET username = ?, email = ?, password_hash = ?, reset_password_token = ?, role = ?,
            approved = ?, interface_language = ?, sensitive_content_handling = ?,
            pagination_settings = ?, tag_cloud_settings = ?, file_list_settings = ?,
            renderer_settings = ?, problem_settings = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.reset_password_token)
    .bind(user.role.to_string())
    .bind(user.approved)
    .bind(&user.interface_language)
    .bind(&user.sensitive_content_handling)
    .bind(&settings.pagination)
    .bind(&settings.tag_cloud)
    .bind(&settings.file_list)
    .bind(&settings.renderer)
    .bind(&settings.problem)
    .bind(now)
    .bind(user.id)
    .execute(pool)
    .await
    .context("Failed to update user")?;

    Ok(User {
        updated_at: now,
        ..user.clone()
    })
}

fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> Result<User> {
    let role: String = row.get("role");

    Ok(User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        reset_password_token: row.get("reset_password_token"),
        role: parse_role(&role)?,
        approved: row.get("approved"),
        interface_language: row.get("interface_language"),
        sensitive_content_handling: row.get("sensitive_content_handling"),
        pagination_settings: from_json("pagination_settings", row.get("pagination_settings"))?,
        tag_cloud_settings: from_json("tag_cloud_settings", row.get("tag_cloud_settings"))?,
        file_list_settings: from_json("file_list_settings", row.get("file_list_settings"))?,
        renderer_settings: from_json("renderer_settings", row.get("renderer_settings"))?,
        problem_settings: from_json("problem_settings", row.get("problem_settings"))?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use crate::models::{PaginationSettings, RendererSettings, FIRST_USE_TOKEN};
    use std::collections::HashMap;

    async fn setup_test_repo() -> SqlxUserRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxUserRepository::new(pool)
    }

    fn create_test_user(username: &str, email: &str) -> User {
        User::new(
            username.to_string(),
            email.to_string(),
            "not-a-real-hash".to_string(),
            UserRole::Contributor,
        )
    }

    #[tokio::test]
    async fn test_create_and_get_user() {
        let repo = setup_test_repo().await;
        let created = repo
            .create(&create_test_user("maker", "maker@example.com"))
            .await
            .expect("Failed to create user");

        assert!(created.id > 0);

        let found = repo
            .get_by_id(created.id)
            .await
            .expect("Failed to get user")
            .expect("User not found");
        assert_eq!(found.username, "maker");
        assert_eq!(found.role, UserRole::Contributor);
        assert!(found.approved);
        assert!(found.pagination_settings.is_none());
    }

    #[tokio::test]
    async fn test_lookup_by_username_and_email() {
        let repo = setup_test_repo().await;
        repo.create(&create_test_user("findme", "findme@example.com"))
            .await
            .expect("Failed to create user");

        assert!(repo.get_by_username("findme").await.unwrap().is_some());
        assert!(repo
            .get_by_email("findme@example.com")
            .await
            .unwrap()
            .is_some());
        assert!(repo.get_by_username("nobody").await.unwrap().is_none());
        assert!(repo.get_by_id(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_persists_settings_groups() {
        let repo = setup_test_repo().await;
        let mut user = repo
            .create(&create_test_user("maker", "maker@example.com"))
            .await
            .unwrap();

        user.reset_password_token = Some(FIRST_USE_TOKEN.to_string());
        user.interface_language = Some("de".to_string());
        user.pagination_settings = Some(PaginationSettings {
            models: true,
            creators: false,
            collections: true,
            per_page: 12,
        });
        user.renderer_settings = Some(RendererSettings {
            grid_width: 200,
            grid_depth: 200,
            show_grid: true,
            ..Default::default()
        });
        user.problem_settings = Some(HashMap::from([(
            "missing".to_string(),
            "warning".to_string(),
        )]));
        repo.update(&user).await.expect("Failed to update user");

        let found = repo.get_by_id(user.id).await.unwrap().unwrap();
        assert!(found.is_first_use());
        assert_eq!(found.interface_language.as_deref(), Some("de"));
        assert_eq!(found.pagination_settings, user.pagination_settings);
        assert_eq!(found.renderer_settings, user.renderer_settings);
        assert_eq!(found.problem_settings, user.problem_settings);
        assert!(found.tag_cloud_settings.is_none());
    }

    #[tokio::test]
    async fn test_delete_and_count() {
        let repo = setup_test_repo().await;
        let user = repo
            .create(&create_test_user("a_user", "a@example.com"))
            .await
            .unwrap();
        repo.create(&create_test_user("b_user", "b@example.com"))
            .await
            .unwrap();
        assert_eq!(repo.count().await.unwrap(), 2);

        repo.delete(user.id).await.expect("Failed to delete user");
        assert_eq!(repo.count().await.unwrap(), 1);
        assert!(repo.get_by_id(user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unique_username_constraint() {
        let repo = setup_test_repo().await;
        repo.create(&create_test_user("taken", "one@example.com"))
            .await
            .unwrap();

        let result = repo
            .create(&create_test_user("taken", "two@example.com"))
            .await;
        assert!(result.is_err());
    }
}
