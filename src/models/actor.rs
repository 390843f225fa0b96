//! Federation actors and their activity log

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An actor as received from (or published to) the federation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub id: i64,
    /// Display name
    pub name: String,
    /// Preferred username
    pub username: String,
    /// Whether the actor is hosted on this instance
    pub local: bool,
    /// Extension fields from the actor document (`summary`, `attachment`, ...)
    pub extensions: Map<String, Value>,
}

impl Actor {
    /// String extension field, if present and a string
    pub fn extension_str(&self, key: &str) -> Option<&str> {
        self.extensions.get(key).and_then(Value::as_str)
    }
}

/// Federation objects the mapper can be handed.
#[derive(Debug, Clone)]
pub enum FederatedObject {
    Actor(Actor),
    /// Any other ActivityPub object, identified by its `type`
    Other { kind: String, document: Value },
}

impl FederatedObject {
    /// The ActivityPub type name of the object
    pub fn kind(&self) -> &str {
        match self {
            FederatedObject::Actor(_) => "Actor",
            FederatedObject::Other { kind, .. } => kind,
        }
    }
}

/// An entry in an actor's activity log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: i64,
    pub actor_id: i64,
    pub action: String,
    pub entity_type: String,
    pub entity_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Input for recording an activity
#[derive(Debug, Clone)]
pub struct CreateActivityInput {
    pub actor_id: i64,
    pub action: String,
    pub entity_type: String,
    pub entity_id: i64,
}

/// Input for storing an actor
#[derive(Debug, Clone, Default)]
pub struct CreateActorInput {
    pub name: String,
    pub username: String,
    pub local: bool,
    pub extensions: Map<String, Value>,
}
