//! Model repository
//!
//! Library models with their external links, and the files attached to them.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{CreateModelInput, Link, Model, ModelFile};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Model repository trait
#[async_trait]
pub trait ModelRepository: Send + Sync {
    /// Create a model together with its links
    async fn create(&self, input: &CreateModelInput) -> Result<Model>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Model>>;

    /// Most recently created models, newest first, ignoring any visibility scoping
    async fn list_recent_unscoped(&self, limit: i64) -> Result<Vec<Model>>;
}

/// SQLx-based model repository implementation
pub struct SqlxModelRepository {
    pool: DynDatabasePool,
}

impl SqlxModelRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ModelRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ModelRepository for SqlxModelRepository {
    async fn create(&self, input: &CreateModelInput) -> Result<Model> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_model_sqlite(self.pool.sqlite()?, input).await,
            DatabaseDriver::Mysql => create_model_mysql(self.pool.mysql()?, input).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Model>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_model_by_id_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => get_model_by_id_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn list_recent_unscoped(&self, limit: i64) -> Result<Vec<Model>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_recent_sqlite(self.pool.sqlite()?, limit).await,
            DatabaseDriver::Mysql => list_recent_mysql(self.pool.mysql()?, limit).await,
        }
    }
}

const MODEL_COLUMNS: &str = "id, name, slug, caption, notes, actor_id, created_at, updated_at";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_model_sqlite(pool: &SqlitePool, input: &CreateModelInput) -> Result<Model> {
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        r#"
        INSERT INTO models (name, slug, caption, notes, actor_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.name)
    .bind(&input.slug)
    .bind(&input.caption)
    .bind(&input.notes)
    .bind(input.actor_id)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("Failed to create model")?;
    let id = result.last_insert_rowid();

    let mut links = Vec::with_capacity(input.link_urls.len());
    for url in &input.link_urls {
        let result = sqlx::query("INSERT INTO links (model_id, url) VALUES (?, ?)")
            .bind(id)
            .bind(url)
            .execute(&mut *tx)
            .await
            .context("Failed to create model link")?;
        links.push(Link {
            id: result.last_insert_rowid(),
            url: url.clone(),
        });
    }

    tx.commit().await?;

    Ok(Model {
        id,
        name: input.name.clone(),
        slug: input.slug.clone(),
        caption: input.caption.clone(),
        notes: input.notes.clone(),
        actor_id: input.actor_id,
        links,
        created_at: now,
        updated_at: now,
    })
}

async fn get_model_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Model>> {
    let row = sqlx::query(&format!("SELECT {} FROM models WHERE id = ?", MODEL_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get model by ID")?;

    match row {
        Some(row) => {
            let mut model = row_to_model_sqlite(&row);
            model.links = get_links_sqlite(pool, model.id).await?;
            Ok(Some(model))
        }
        None => Ok(None),
    }
}

async fn list_recent_sqlite(pool: &SqlitePool, limit: i64) -> Result<Vec<Model>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM models ORDER BY created_at DESC, id DESC LIMIT ?",
        MODEL_COLUMNS
    ))
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("Failed to list models")?;

    let mut models = Vec::with_capacity(rows.len());
    for row in &rows {
        let mut model = row_to_model_sqlite(row);
        model.links = get_links_sqlite(pool, model.id).await?;
        models.push(model);
    }
    Ok(models)
}

async fn get_links_sqlite(pool: &SqlitePool, model_id: i64) -> Result<Vec<Link>> {
    let rows = sqlx::query("SELECT id, url FROM links WHERE model_id = ? ORDER BY id")
        .bind(model_id)
        .fetch_all(pool)
        .await
        .context("Failed to get model links")?;
    Ok(rows
        .iter()
        .map(|r| Link {
            id: r.get("id"),
            url: r.get("url"),
        })
        .collect())
}

fn row_to_model_sqlite(row: &sqlx::sqlite::SqliteRow) -> Model {
    Model {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
        caption: row.get("caption"),
        notes: row.get("notes"),
        actor_id: row.get("actor_id"),
        links: Vec::new(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_model_mysql(pool: &MySqlPool, input: &CreateModelInput) -> Result<Model> {
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        r#"
        INSERT INTO models (name, slug, caption, notes, actor_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.name)
    .bind(&input.slug)
    .bind(&input.caption)
    .bind(&input.notes)
    .bind(input.actor_id)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("Failed to create model")?;
    let id = result.last_insert_id() as i64;

    let mut links = Vec::with_capacity(input.link_urls.len());
    for url in &input.link_urls {
        let result = sqlx::query("INSERT INTO links (model_id, url) VALUES (?, ?)")
            .bind(id)
            .bind(url)
            .execute(&mut *tx)
            .await
            .context("Failed to create model link")?;
        links.push(Link {
            id: result.last_insert_id() as i64,
            url: url.clone(),
        });
    }

    tx.commit().await?;

    Ok(Model {
        id,
        name: input.name.clone(),
        slug: input.slug.clone(),
        caption: input.caption.clone(),
        notes: input.notes.clone(),
        actor_id: input.actor_id,
        links,
        created_at: now,
        updated_at: now,
    })
}

async fn get_model_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Model>> {
    let row = sqlx::query(&format!("SELECT {} FROM models WHERE id = ?", MODEL_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get model by ID")?;

    match row {
        Some(row) => {
            let mut model = row_to_model_mysql(&row);
            model.links = get_links_mysql(pool, model.id).await?;
            Ok(Some(model))
        }
        None => Ok(None),
    }
}

async fn list_recent_mysql(pool: &MySqlPool, limit: i64) -> Result<Vec<Model>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM models ORDER BY created_at DESC, id DESC LIMIT ?",
        MODEL_COLUMNS
    ))
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("Failed to list models")?;

    let mut models = Vec::with_capacity(rows.len());
    for row in &rows {
        let mut model = row_to_model_mysql(row);
        model.links = get_links_mysql(pool, model.id).await?;
        models.push(model);
    }
    Ok(models)
}

async fn get_links_mysql(pool: &MySqlPool, model_id: i64) -> Result<Vec<Link>> {
    let rows = sqlx::query("SELECT id, url FROM links WHERE model_id = ? ORDER BY id")
        .bind(model_id)
        .fetch_all(pool)
        .await
        .context("Failed to get model links")?;
    Ok(rows
        .iter()
        .map(|r| Link {
            id: r.get("id"),
            url: r.get("url"),
        })
        .collect())
}

fn row_to_model_mysql(row: &sqlx::mysql::MySqlRow) -> Model {
    Model {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
        caption: row.get("caption"),
        notes: row.get("notes"),
        actor_id: row.get("actor_id"),
        links: Vec::new(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

// ============================================================================
// Model files
// ============================================================================

/// Model file repository trait
#[async_trait]
pub trait ModelFileRepository: Send + Sync {
    async fn create(&self, model_id: i64, filename: &str) -> Result<ModelFile>;

    /// A file, only if it belongs to `model_id`
    async fn get(&self, model_id: i64, id: i64) -> Result<Option<ModelFile>>;

    async fn delete(&self, id: i64) -> Result<()>;
}

/// SQLx-based model file repository implementation
pub struct SqlxModelFileRepository {
    pool: DynDatabasePool,
}

impl SqlxModelFileRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ModelFileRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ModelFileRepository for SqlxModelFileRepository {
    async fn create(&self, model_id: i64, filename: &str) -> Result<ModelFile> {
        let now = Utc::now();
        let sql = "INSERT INTO model_files (model_id, filename, created_at) VALUES (?, ?, ?)";
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(model_id)
                .bind(filename)
                .bind(now)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to create model file")?
                .last_insert_rowid(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(model_id)
                .bind(filename)
                .bind(now)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to create model file")?
                .last_insert_id() as i64,
        };

        Ok(ModelFile {
            id,
            model_id,
            filename: filename.to_string(),
            created_at: now,
        })
    }

    async fn get(&self, model_id: i64, id: i64) -> Result<Option<ModelFile>> {
        let sql = "SELECT id, model_id, filename, created_at FROM model_files \
                   WHERE id = ? AND model_id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(sql)
                    .bind(id)
                    .bind(model_id)
                    .fetch_optional(self.pool.sqlite()?)
                    .await
                    .context("Failed to get model file")?;
                Ok(row.map(|r| ModelFile {
                    id: r.get("id"),
                    model_id: r.get("model_id"),
                    filename: r.get("filename"),
                    created_at: r.get("created_at"),
                }))
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(sql)
                    .bind(id)
                    .bind(model_id)
                    .fetch_optional(self.pool.mysql()?)
                    .await
                    .context("Failed to get model file")?;
                Ok(row.map(|r| ModelFile {
                    id: r.get("id"),
                    model_id: r.get("model_id"),
                    filename: r.get("filename"),
                    created_at: r.get("created_at"),
                }))
            }
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let sql = "DELETE FROM model_files WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(self.pool.sqlite()?)
                    .await
                    .context("Failed to delete model file")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(self.pool.mysql()?)
                    .await
                    .context("Failed to delete model file")?;
            }
        }
        Ok(())
    }
}
