//! Model file policy
//!
//! File permissions derive from the parent model: viewing a file is viewing
//! the model, and every change to its files is editing the model.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use super::{authorize, model, PolicyError};
use crate::models::{Model, ModelFile, User};

/// File types the converter accepts as input
pub const CONVERTIBLE_EXTENSIONS: &[&str] = &["stl", "obj"];

/// A file together with the model that owns it
#[derive(Debug, Clone, Copy)]
pub struct FileResource<'a> {
    pub file: &'a ModelFile,
    pub model: &'a Model,
}

/// Operations on a model file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileAction {
    Show,
    Create,
    Update,
    Delete,
    Convert,
    BulkEdit,
    BulkUpdate,
}

impl FileAction {
    pub const ALL: [FileAction; 7] = [
        FileAction::Show,
        FileAction::Create,
        FileAction::Update,
        FileAction::Delete,
        FileAction::Convert,
        FileAction::BulkEdit,
        FileAction::BulkUpdate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileAction::Show => "show",
            FileAction::Create => "create",
            FileAction::Update => "update",
            FileAction::Delete => "delete",
            FileAction::Convert => "convert",
            FileAction::BulkEdit => "bulk_edit",
            FileAction::BulkUpdate => "bulk_update",
        }
    }
}

impl fmt::Display for FileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn show(user: Option<&User>, resource: FileResource<'_>) -> bool {
    model::show(user, resource.model)
}

pub fn create(user: Option<&User>, resource: FileResource<'_>) -> bool {
    model::edit(user, resource.model)
}

pub fn update(user: Option<&User>, resource: FileResource<'_>) -> bool {
    create(user, resource)
}

pub fn delete(user: Option<&User>, resource: FileResource<'_>) -> bool {
    create(user, resource)
}

pub fn convert(user: Option<&User>, resource: FileResource<'_>) -> bool {
    create(user, resource)
        && CONVERTIBLE_EXTENSIONS.contains(&resource.file.extension().as_str())
}

pub fn bulk_update(user: Option<&User>, resource: FileResource<'_>) -> bool {
    create(user, resource)
}

pub fn bulk_edit(user: Option<&User>, resource: FileResource<'_>) -> bool {
    bulk_update(user, resource)
}

/// Evaluate the predicate for `action`
pub fn allowed(action: FileAction, user: Option<&User>, resource: FileResource<'_>) -> bool {
    match action {
        FileAction::Show => show(user, resource),
        FileAction::Create => create(user, resource),
        FileAction::Update => update(user, resource),
        FileAction::Delete => delete(user, resource),
        FileAction::Convert => convert(user, resource),
        FileAction::BulkEdit => bulk_edit(user, resource),
        FileAction::BulkUpdate => bulk_update(user, resource),
    }
}

/// Guard form of [`allowed`]
pub fn check(
    action: FileAction,
    user: Option<&User>,
    resource: FileResource<'_>,
) -> Result<(), PolicyError> {
    authorize(allowed(action, user, resource))
}

/// Every predicate, keyed by operation name
pub fn permissions(user: Option<&User>, resource: FileResource<'_>) -> BTreeMap<&'static str, bool> {
    FileAction::ALL
        .iter()
        .map(|action| (action.as_str(), allowed(*action, user, resource)))
        .collect()
}
