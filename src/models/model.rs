//! Library models and their files

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A 3D model entry in the library
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub caption: Option<String>,
    pub notes: Option<String>,
    /// Actor representing this model on the federation
    pub actor_id: Option<i64>,
    pub links: Vec<Link>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// External link attached to a model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub id: i64,
    pub url: String,
}

/// Input for creating a model
#[derive(Debug, Clone, Default)]
pub struct CreateModelInput {
    pub name: String,
    pub slug: String,
    pub caption: Option<String>,
    pub notes: Option<String>,
    pub link_urls: Vec<String>,
    pub actor_id: Option<i64>,
}

/// A file belonging to a model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelFile {
    pub id: i64,
    pub model_id: i64,
    pub filename: String,
    pub created_at: DateTime<Utc>,
}

impl ModelFile {
    /// Lowercased text after the last `.` in the filename; empty if none.
    pub fn extension(&self) -> String {
        match self.filename.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => ext.to_lowercase(),
            _ => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str) -> ModelFile {
        ModelFile {
            id: 1,
            model_id: 1,
            filename: name.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_extension_is_lowercased_suffix() {
        assert_eq!(file("benchy.STL").extension(), "stl");
        assert_eq!(file("part.v2.obj").extension(), "obj");
        assert_eq!(file("scene.fbx").extension(), "fbx");
    }

    #[test]
    fn test_extension_missing() {
        assert_eq!(file("README").extension(), "");
        assert_eq!(file(".hidden").extension(), "");
    }
}
