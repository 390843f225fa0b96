//! Activity log side effects

use anyhow::Context;
use std::sync::Arc;
use thiserror::Error;

use crate::db::repositories::ActorRepository;
use crate::models::{Activity, CreateActivityInput, Model};

/// Action recorded when a model is first published
pub const ACTION_CREATE: &str = "Create";
/// Entity type recorded for library models
pub const ENTITY_MODEL: &str = "Model";

#[derive(Debug, Error)]
pub enum ActivityError {
    #[error("Model {0} has no federation actor")]
    MissingActor(i64),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Records activity log entries for library changes
pub struct ActivityService {
    actor_repo: Arc<dyn ActorRepository>,
}

impl ActivityService {
    pub fn new(actor_repo: Arc<dyn ActorRepository>) -> Self {
        Self { actor_repo }
    }

    /// Record the `Create` activity for a newly created model.
    pub async fn post_creation_activity(&self, model: &Model) -> Result<Activity, ActivityError> {
        let actor_id = model.actor_id.ok_or(ActivityError::MissingActor(model.id))?;

        let activity = self
            .actor_repo
            .create_activity(&CreateActivityInput {
                actor_id,
                action: ACTION_CREATE.to_string(),
                entity_type: ENTITY_MODEL.to_string(),
                entity_id: model.id,
            })
            .await
            .context("Failed to record creation activity")?;

        tracing::debug!(model_id = model.id, actor_id, "Recorded creation activity");
        Ok(activity)
    }

    /// Whether the actor has no activity yet
    pub async fn has_no_activity(&self, actor_id: i64) -> Result<bool, ActivityError> {
        let count = self
            .actor_repo
            .count_activities(actor_id)
            .await
            .context("Failed to count activities")?;
        Ok(count == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{ModelRepository, SqlxActorRepository, SqlxModelRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{CreateActorInput, CreateModelInput};

    #[tokio::test]
    async fn test_post_creation_activity() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let actors = SqlxActorRepository::boxed(pool.clone());
        let models = SqlxModelRepository::new(pool);
        let service = ActivityService::new(actors.clone());

        let actor = actors
            .create(&CreateActorInput {
                name: "Benchy".to_string(),
                username: "benchy".to_string(),
                local: true,
                ..Default::default()
            })
            .await
            .unwrap();
        let model = models
            .create(&CreateModelInput {
                name: "Benchy".to_string(),
                slug: "benchy".to_string(),
                actor_id: Some(actor.id),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(service.has_no_activity(actor.id).await.unwrap());
        let activity = service.post_creation_activity(&model).await.unwrap();
        assert_eq!(activity.action, ACTION_CREATE);
        assert_eq!(activity.entity_id, model.id);
        assert!(!service.has_no_activity(actor.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_model_without_actor_is_an_error() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let service = ActivityService::new(SqlxActorRepository::boxed(pool.clone()));
        let model = SqlxModelRepository::new(pool)
            .create(&CreateModelInput {
                name: "Orphan".to_string(),
                slug: "orphan".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(matches!(
            service.post_creation_activity(&model).await,
            Err(ActivityError::MissingActor(id)) if id == model.id
        ));
    }
}
