//! Activity backfill
//!
//! One-shot repair: give the most recently created models a creation
//! activity when their actor has none. Each model is processed
//! independently; a failure is recorded in the report and the batch moves on.

use std::sync::Arc;

use crate::db::repositories::ModelRepository;
use crate::models::Model;
use crate::services::activity::ActivityService;

/// How many of the newest models are examined
pub const BACKFILL_BATCH_SIZE: i64 = 20;

/// What happened to one model
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackfillOutcome {
    /// A creation activity was recorded
    Created,
    /// The actor already had activity
    Skipped,
    Failed(String),
}

/// Per-model outcomes, newest model first
#[derive(Debug, Default)]
pub struct BackfillReport {
    pub items: Vec<(i64, BackfillOutcome)>,
}

impl BackfillReport {
    fn count(&self, pred: impl Fn(&BackfillOutcome) -> bool) -> usize {
        self.items.iter().filter(|(_, o)| pred(o)).count()
    }

    pub fn created(&self) -> usize {
        self.count(|o| *o == BackfillOutcome::Created)
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| *o == BackfillOutcome::Skipped)
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, BackfillOutcome::Failed(_)))
    }
}

pub struct BackfillService {
    model_repo: Arc<dyn ModelRepository>,
    activities: ActivityService,
}

impl BackfillService {
    pub fn new(model_repo: Arc<dyn ModelRepository>, activities: ActivityService) -> Self {
        Self {
            model_repo,
            activities,
        }
    }

    /// Run over the newest models. Only loading the batch itself can fail.
    pub async fn run(&self) -> anyhow::Result<BackfillReport> {
        let models = self
            .model_repo
            .list_recent_unscoped(BACKFILL_BATCH_SIZE)
            .await?;

        let mut report = BackfillReport::default();
        for model in &models {
            let outcome = match self.backfill_one(model).await {
                Ok(outcome) => outcome,
                Err(reason) => {
                    tracing::warn!(model_id = model.id, %reason, "Backfill failed for model");
                    BackfillOutcome::Failed(reason)
                }
            };
            report.items.push((model.id, outcome));
        }

        tracing::info!(
            created = report.created(),
            skipped = report.skipped(),
            failed = report.failed(),
            "Activity backfill finished"
        );
        Ok(report)
    }

    async fn backfill_one(&self, model: &Model) -> Result<BackfillOutcome, String> {
        let actor_id = model
            .actor_id
            .ok_or_else(|| "model has no federation actor".to_string())?;

        if !self
            .activities
            .has_no_activity(actor_id)
            .await
            .map_err(|e| e.to_string())?
        {
            return Ok(BackfillOutcome::Skipped);
        }

        self.activities
            .post_creation_activity(model)
            .await
            .map_err(|e| e.to_string())?;
        Ok(BackfillOutcome::Created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        ActorRepository, SqlxActorRepository, SqlxModelRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{CreateActivityInput, CreateActorInput, CreateModelInput};

    struct Fixture {
        actors: Arc<dyn ActorRepository>,
        models: Arc<dyn ModelRepository>,
        service: BackfillService,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let actors = SqlxActorRepository::boxed(pool.clone());
        let models = SqlxModelRepository::boxed(pool);
        let service = BackfillService::new(models.clone(), ActivityService::new(actors.clone()));
        Fixture {
            actors,
            models,
            service,
        }
    }

    impl Fixture {
        async fn model_with_actor(&self, name: &str) -> (Model, i64) {
            let actor = self
                .actors
                .create(&CreateActorInput {
                    name: name.to_string(),
                    username: name.to_lowercase(),
                    local: true,
                    ..Default::default()
                })
                .await
                .unwrap();
            let model = self
                .models
                .create(&CreateModelInput {
                    name: name.to_string(),
                    slug: name.to_lowercase(),
                    actor_id: Some(actor.id),
                    ..Default::default()
                })
                .await
                .unwrap();
            (model, actor.id)
        }
    }

    #[tokio::test]
    async fn test_creates_missing_activity() {
        let fx = setup().await;
        let (model, actor_id) = fx.model_with_actor("Benchy").await;

        let report = fx.service.run().await.unwrap();
        assert_eq!(report.items, vec![(model.id, BackfillOutcome::Created)]);
        assert_eq!(fx.actors.count_activities(actor_id).await.unwrap(), 1);

        let report = fx.service.run().await.unwrap();
        assert_eq!(report.items, vec![(model.id, BackfillOutcome::Skipped)]);
        assert_eq!(fx.actors.count_activities(actor_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_actor_with_activity_is_untouched() {
        let fx = setup().await;
        let (model, actor_id) = fx.model_with_actor("Benchy").await;
        fx.actors
            .create_activity(&CreateActivityInput {
                actor_id,
                action: "Update".to_string(),
                entity_type: "Model".to_string(),
                entity_id: model.id,
            })
            .await
            .unwrap();

        let report = fx.service.run().await.unwrap();
        assert_eq!(report.skipped(), 1);
        assert_eq!(fx.actors.count_activities(actor_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_batch() {
        let fx = setup().await;
        let (first, _) = fx.model_with_actor("First").await;
        let orphan = fx
            .models
            .create(&CreateModelInput {
                name: "Orphan".to_string(),
                slug: "orphan".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        let (last, _) = fx.model_with_actor("Last").await;

        let report = fx.service.run().await.unwrap();
        let ids: Vec<_> = report.items.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![last.id, orphan.id, first.id]);
        assert_eq!(report.created(), 2);
        assert_eq!(report.failed(), 1);
        assert!(matches!(report.items[1].1, BackfillOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_only_newest_batch_is_examined() {
        let fx = setup().await;
        for i in 0..(BACKFILL_BATCH_SIZE + 3) {
            fx.model_with_actor(&format!("Model{}", i)).await;
        }

        let report = fx.service.run().await.unwrap();
        assert_eq!(report.items.len(), BACKFILL_BATCH_SIZE as usize);
        assert_eq!(report.created(), BACKFILL_BATCH_SIZE as usize);
    }
}
