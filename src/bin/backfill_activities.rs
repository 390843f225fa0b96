//! One-shot repair: record a creation activity for recent models whose
//! actor has none.
//!
//! Reads the same `config.yml` as the server. Exits non-zero only when the
//! batch itself cannot be loaded; per-model failures are logged and counted.

use anyhow::Result;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use filament::{
    config::Config,
    db::{
        self,
        repositories::{SqlxActorRepository, SqlxModelRepository},
    },
    services::{ActivityService, BackfillService},
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "filament=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load_with_env(Path::new("config.yml"))?;
    let pool = db::create_pool(&config.database).await?;
    db::migrations::run_migrations(&pool).await?;

    let service = BackfillService::new(
        SqlxModelRepository::boxed(pool.clone()),
        ActivityService::new(SqlxActorRepository::boxed(pool.clone())),
    );
    let report = service.run().await?;

    println!(
        "created: {}, skipped: {}, failed: {}",
        report.created(),
        report.skipped(),
        report.failed()
    );

    pool.close().await;
    Ok(())
}
