//! Actor repository
//!
//! Federation actors and their activity log.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Activity, Actor, CreateActivityInput, CreateActorInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Actor repository trait
#[async_trait]
pub trait ActorRepository: Send + Sync {
    async fn create(&self, input: &CreateActorInput) -> Result<Actor>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Actor>>;

    /// Number of activities recorded for an actor
    async fn count_activities(&self, actor_id: i64) -> Result<i64>;

    async fn create_activity(&self, input: &CreateActivityInput) -> Result<Activity>;
}

/// SQLx-based actor repository implementation
pub struct SqlxActorRepository {
    pool: DynDatabasePool,
}

impl SqlxActorRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ActorRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ActorRepository for SqlxActorRepository {
    async fn create(&self, input: &CreateActorInput) -> Result<Actor> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_actor_sqlite(self.pool.sqlite()?, input).await,
            DatabaseDriver::Mysql => create_actor_mysql(self.pool.mysql()?, input).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Actor>> {
        let sql = "SELECT id, name, username, local, extensions FROM actors WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(sql)
                    .bind(id)
                    .fetch_optional(self.pool.sqlite()?)
                    .await
                    .context("Failed to get actor by ID")?;
                row.map(|r| {
                    actor_from_parts(
                        r.get("id"),
                        r.get("name"),
                        r.get("username"),
                        r.get("local"),
                        r.get("extensions"),
                    )
                })
                .transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(sql)
                    .bind(id)
                    .fetch_optional(self.pool.mysql()?)
                    .await
                    .context("Failed to get actor by ID")?;
                row.map(|r| {
                    actor_from_parts(
                        r.get("id"),
                        r.get("name"),
                        r.get("username"),
                        r.get("local"),
                        r.get("extensions"),
                    )
                })
                .transpose()
            }
        }
    }

    async fn count_activities(&self, actor_id: i64) -> Result<i64> {
        let sql = "SELECT COUNT(*) FROM activities WHERE actor_id = ?";
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query_scalar(sql)
                    .bind(actor_id)
                    .fetch_one(self.pool.sqlite()?)
                    .await
            }
            DatabaseDriver::Mysql => {
                sqlx::query_scalar(sql)
                    .bind(actor_id)
                    .fetch_one(self.pool.mysql()?)
                    .await
            }
        }
        .context("Failed to count activities")?;
        Ok(count)
    }

    async fn create_activity(&self, input: &CreateActivityInput) -> Result<Activity> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_activity_sqlite(self.pool.sqlite()?, input).await,
            DatabaseDriver::Mysql => create_activity_mysql(self.pool.mysql()?, input).await,
        }
    }
}

fn actor_from_parts(
    id: i64,
    name: String,
    username: String,
    local: bool,
    extensions: String,
) -> Result<Actor> {
    let extensions: Map<String, Value> = serde_json::from_str(&extensions)
        .with_context(|| format!("Invalid extensions JSON for actor {}", id))?;
    Ok(Actor {
        id,
        name,
        username,
        local,
        extensions,
    })
}

fn encode_extensions(input: &CreateActorInput) -> Result<String> {
    serde_json::to_string(&input.extensions).context("Failed to encode actor extensions")
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_actor_sqlite(pool: &SqlitePool, input: &CreateActorInput) -> Result<Actor> {
    let result = sqlx::query(
        "INSERT INTO actors (name, username, local, extensions, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&input.name)
    .bind(&input.username)
    .bind(input.local)
    .bind(encode_extensions(input)?)
    .bind(Utc::now())
    .execute(pool)
    .await
    .context("Failed to create actor")?;

    Ok(Actor {
        id: result.last_insert_rowid(),
        name: input.name.clone(),
        username: input.username.clone(),
        local: input.local,
        extensions: input.extensions.clone(),
    })
}

async fn create_activity_sqlite(pool: &SqlitePool, input: &CreateActivityInput) -> Result<Activity> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO activities (actor_id, action, entity_type, entity_id, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(input.actor_id)
    .bind(&input.action)
    .bind(&input.entity_type)
    .bind(input.entity_id)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create activity")?;

    Ok(Activity {
        id: result.last_insert_rowid(),
        actor_id: input.actor_id,
        action: input.action.clone(),
        entity_type: input.entity_type.clone(),
        entity_id: input.entity_id,
        created_at: now,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_actor_mysql(pool: &MySqlPool, input: &CreateActorInput) -> Result<Actor> {
    let result = sqlx::query(
        "INSERT INTO actors (name, username, local, extensions, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&input.name)
    .bind(&input.username)
    .bind(input.local)
    .bind(encode_extensions(input)?)
    .bind(Utc::now())
    .execute(pool)
    .await
    .context("Failed to create actor")?;

    Ok(Actor {
        id: result.last_insert_id() as i64,
        name: input.name.clone(),
        username: input.username.clone(),
        local: input.local,
        extensions: input.extensions.clone(),
    })
}

async fn create_activity_mysql(pool: &MySqlPool, input: &CreateActivityInput) -> Result<Activity> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO activities (actor_id, action, entity_type, entity_id, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(input.actor_id)
    .bind(&input.action)
    .bind(&input.entity_type)
    .bind(input.entity_id)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create activity")?;

    Ok(Activity {
        id: result.last_insert_id() as i64,
        actor_id: input.actor_id,
        action: input.action.clone(),
        entity_type: input.entity_type.clone(),
        entity_id: input.entity_id,
        created_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use serde_json::json;

    async fn setup() -> SqlxActorRepository {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        SqlxActorRepository::new(pool)
    }

    #[tokio::test]
    async fn test_actor_extensions_roundtrip() {
        let repo = setup().await;
        let mut extensions = Map::new();
        extensions.insert("summary".to_string(), json!("Remote printer"));

        let created = repo
            .create(&CreateActorInput {
                name: "Remote".to_string(),
                username: "remote".to_string(),
                local: false,
                extensions,
            })
            .await
            .unwrap();

        let found = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found, created);
        assert_eq!(found.extension_str("summary"), Some("Remote printer"));
    }

    #[tokio::test]
    async fn test_activity_count() {
        let repo = setup().await;
        let actor = repo
            .create(&CreateActorInput {
                name: "Local".to_string(),
                username: "local".to_string(),
                local: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(repo.count_activities(actor.id).await.unwrap(), 0);

        repo.create_activity(&CreateActivityInput {
            actor_id: actor.id,
            action: "Create".to_string(),
            entity_type: "Model".to_string(),
            entity_id: 1,
        })
        .await
        .unwrap();
        assert_eq!(repo.count_activities(actor.id).await.unwrap(), 1);
    }
}
