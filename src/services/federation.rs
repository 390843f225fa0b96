//! Federated actor → local model mapping
//!
//! A remote actor describing a model is turned into exactly one new local
//! `Model`. There is no deduplication here: mapping the same actor twice
//! creates two models.

use anyhow::Context;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use crate::db::repositories::{ActorRepository, ModelRepository};
use crate::models::{Actor, CreateModelInput, FederatedObject, Model};

/// Attachment type carried over as a model link
const LINK_TYPE: &str = "Link";

#[derive(Debug, Error)]
pub enum FederationError {
    /// The object handed to the mapper is not an actor
    #[error("Expected an Actor, got {0}")]
    UnexpectedObject(String),

    #[error("Actor not found")]
    ActorNotFound,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Builds local records from federation objects
pub struct FederationService {
    actor_repo: Arc<dyn ActorRepository>,
    model_repo: Arc<dyn ModelRepository>,
}

impl FederationService {
    pub fn new(
        actor_repo: Arc<dyn ActorRepository>,
        model_repo: Arc<dyn ModelRepository>,
    ) -> Self {
        Self {
            actor_repo,
            model_repo,
        }
    }

    /// Create a model from a federation object.
    ///
    /// Anything other than an actor is rejected before any write.
    pub async fn create_model(&self, object: FederatedObject) -> Result<Model, FederationError> {
        let actor = match object {
            FederatedObject::Actor(actor) => actor,
            other => return Err(FederationError::UnexpectedObject(other.kind().to_string())),
        };

        let model = self
            .model_repo
            .create(&model_input(&actor))
            .await
            .context("Failed to create model from actor")?;

        tracing::info!(
            model_id = model.id,
            actor_id = actor.id,
            links = model.links.len(),
            "Created model from federated actor"
        );
        Ok(model)
    }

    /// Create a model from a stored actor
    pub async fn create_model_for_actor(&self, actor_id: i64) -> Result<Model, FederationError> {
        let actor = self
            .actor_repo
            .get_by_id(actor_id)
            .await
            .context("Failed to load actor")?
            .ok_or(FederationError::ActorNotFound)?;
        self.create_model(FederatedObject::Actor(actor)).await
    }
}

/// Field mapping from an actor to a new model
pub fn model_input(actor: &Actor) -> CreateModelInput {
    CreateModelInput {
        name: actor.name.clone(),
        slug: actor.username.clone(),
        caption: actor.extension_str("summary").map(str::to_string),
        notes: actor.extension_str("content").map(str::to_string),
        link_urls: link_urls(actor),
        actor_id: Some(actor.id),
    }
}

/// `href` of every `Link` attachment, in document order.
fn link_urls(actor: &Actor) -> Vec<String> {
    let Some(Value::Array(attachments)) = actor.extensions.get("attachment") else {
        return Vec::new();
    };

    attachments
        .iter()
        .filter(|entry| entry.get("type").and_then(Value::as_str) == Some(LINK_TYPE))
        .filter_map(|entry| entry.get("href").and_then(Value::as_str))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxActorRepository, SqlxModelRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::CreateActorInput;
    use serde_json::{json, Map};

    async fn setup() -> (FederationService, Arc<dyn ActorRepository>, Arc<dyn ModelRepository>) {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let actors = SqlxActorRepository::boxed(pool.clone());
        let models = SqlxModelRepository::boxed(pool);
        (
            FederationService::new(actors.clone(), models.clone()),
            actors,
            models,
        )
    }

    fn extensions(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    async fn remote_actor(actors: &Arc<dyn ActorRepository>, ext: Value) -> Actor {
        actors
            .create(&CreateActorInput {
                name: "Benchy".to_string(),
                username: "benchy_boat".to_string(),
                local: false,
                extensions: extensions(ext),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_maps_actor_fields() {
        let (service, actors, models) = setup().await;
        let actor = remote_actor(
            &actors,
            json!({
                "summary": "A tugboat",
                "content": "Print at 0.2mm",
                "attachment": [
                    {"type": "Link", "href": "a"},
                    {"type": "Image", "href": "b"}
                ]
            }),
        )
        .await;

        let model = service
            .create_model(FederatedObject::Actor(actor.clone()))
            .await
            .unwrap();

        let stored = models.get_by_id(model.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Benchy");
        assert_eq!(stored.slug, "benchy_boat");
        assert_eq!(stored.caption.as_deref(), Some("A tugboat"));
        assert_eq!(stored.notes.as_deref(), Some("Print at 0.2mm"));
        assert_eq!(stored.actor_id, Some(actor.id));
        let urls: Vec<_> = stored.links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(urls, vec!["a"]);
    }

    #[tokio::test]
    async fn test_missing_attachment_yields_no_links() {
        let (service, actors, _) = setup().await;
        let actor = remote_actor(&actors, json!({})).await;

        let model = service.create_model_for_actor(actor.id).await.unwrap();
        assert!(model.links.is_empty());
        assert!(model.caption.is_none());
    }

    #[tokio::test]
    async fn test_mapping_twice_creates_two_models() {
        let (service, actors, models) = setup().await;
        let actor = remote_actor(&actors, json!({})).await;

        let first = service.create_model_for_actor(actor.id).await.unwrap();
        let second = service.create_model_for_actor(actor.id).await.unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(models.list_recent_unscoped(10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_non_actor_is_rejected_without_writes() {
        let (service, _, models) = setup().await;

        let result = service
            .create_model(FederatedObject::Other {
                kind: "Note".to_string(),
                document: json!({"type": "Note", "content": "hi"}),
            })
            .await;

        assert!(matches!(result, Err(FederationError::UnexpectedObject(kind)) if kind == "Note"));
        assert!(models.list_recent_unscoped(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_actor() {
        let (service, _, _) = setup().await;
        assert!(matches!(
            service.create_model_for_actor(42).await,
            Err(FederationError::ActorNotFound)
        ));
    }
}
