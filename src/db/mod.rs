//! Database layer
//!
//! SQLite (default, single-file deployment) or MySQL, selected by
//! configuration. Everything above this module talks to `DatabasePool`
//! and the repository traits only.
//!
//! ```ignore
//! use filament::config::DatabaseConfig;
//! use filament::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
