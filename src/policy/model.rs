//! Library model policy

use crate::models::{Model, User};

/// Any approved, signed-in account may view models.
pub fn show(user: Option<&User>, _model: &Model) -> bool {
    user.is_some_and(User::is_active_for_authentication)
}

/// Approved contributors, moderators and administrators may edit models.
pub fn edit(user: Option<&User>, _model: &Model) -> bool {
    user.is_some_and(|u| u.is_active_for_authentication() && u.is_contributor())
}
