//! Site settings repository
//!
//! Key/value storage behind the site-wide switches (`approve_signups`,
//! `registration_enabled`, ...).

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;

/// Repository trait for settings operations
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Get a single value by key
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Get every stored setting
    async fn get_all(&self) -> Result<HashMap<String, String>>;

    /// Insert or replace a value
    async fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// SQLx-based settings repository
pub struct SqlxSettingsRepository {
    pool: DynDatabasePool,
}

impl SqlxSettingsRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SettingsRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SettingsRepository for SqlxSettingsRepository {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_sqlite(self.pool.sqlite()?, key).await,
            DatabaseDriver::Mysql => get_mysql(self.pool.mysql()?, key).await,
        }
    }

    async fn get_all(&self) -> Result<HashMap<String, String>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_all_sqlite(self.pool.sqlite()?).await,
            DatabaseDriver::Mysql => get_all_mysql(self.pool.mysql()?).await,
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => set_sqlite(self.pool.sqlite()?, key, value).await,
            DatabaseDriver::Mysql => set_mysql(self.pool.mysql()?, key, value).await,
        }
    }
}

// SQLite implementations
async fn get_sqlite(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let row = sqlx::query("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("Failed to read setting {}", key))?;
    Ok(row.map(|r| r.get("value")))
}

async fn get_all_sqlite(pool: &SqlitePool) -> Result<HashMap<String, String>> {
    let rows = sqlx::query("SELECT key, value FROM settings")
        .fetch_all(pool)
        .await
        .context("Failed to read settings")?;
    Ok(rows
        .into_iter()
        .map(|r| (r.get("key"), r.get("value")))
        .collect())
}

async fn set_sqlite(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO settings (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await
    .with_context(|| format!("Failed to write setting {}", key))?;
    Ok(())
}

// MySQL implementations
async fn get_mysql(pool: &MySqlPool, key: &str) -> Result<Option<String>> {
    let row = sqlx::query("SELECT value FROM settings WHERE `key` = ?")
        .bind(key)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("Failed to read setting {}", key))?;
    Ok(row.map(|r| r.get("value")))
}

async fn get_all_mysql(pool: &MySqlPool) -> Result<HashMap<String, String>> {
    let rows = sqlx::query("SELECT `key`, value FROM settings")
        .fetch_all(pool)
        .await
        .context("Failed to read settings")?;
    Ok(rows
        .into_iter()
        .map(|r| (r.get("key"), r.get("value")))
        .collect())
}

async fn set_mysql(pool: &MySqlPool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO settings (`key`, value) VALUES (?, ?)
         ON DUPLICATE KEY UPDATE value = VALUES(value)",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await
    .with_context(|| format!("Failed to write setting {}", key))?;
    Ok(())
}
