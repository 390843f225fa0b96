//! Authorization policies
//!
//! Policies are plain predicates over `(identity, resource)`, where the
//! identity is the signed-in account, if any. Predicates compose by calling
//! each other explicitly; nothing is cached between calls.

use thiserror::Error;

pub mod model;
pub mod model_file;
pub mod registration;

pub use model_file::{FileAction, FileResource};

/// Raised when a predicate denies an action, before any mutation happens
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("Forbidden: you are not allowed to perform this action")]
    Forbidden,
}

/// Turn a predicate result into a guard
pub fn authorize(allowed: bool) -> Result<(), PolicyError> {
    if allowed {
        Ok(())
    } else {
        Err(PolicyError::Forbidden)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::models::{Model, ModelFile, User, UserRole};
    use chrono::Utc;

    pub fn user(role: UserRole, approved: bool) -> User {
        let mut user = User::new(
            "someone".to_string(),
            "someone@example.com".to_string(),
            "hash".to_string(),
            role,
        );
        user.id = 7;
        user.approved = approved;
        user
    }

    pub fn model() -> Model {
        let now = Utc::now();
        Model {
            id: 1,
            name: "Benchy".to_string(),
            slug: "benchy".to_string(),
            caption: None,
            notes: None,
            actor_id: None,
            links: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn file(filename: &str) -> ModelFile {
        ModelFile {
            id: 3,
            model_id: 1,
            filename: filename.to_string(),
            created_at: Utc::now(),
        }
    }
}
