//! Account registration policy
//!
//! Class-level checks (sign-up, cancel) take no account; record-level checks
//! take the account being acted on.

use crate::models::User;
use crate::services::settings::SiteSettings;

/// Sign-up form and account creation: signed-out visitors, while
/// registration is open.
pub fn create(user: Option<&User>, site: &SiteSettings) -> bool {
    user.is_none() && site.registration_enabled
}

/// Edit, update and destroy: only the account holder.
pub fn manage(user: Option<&User>, account: &User) -> bool {
    user.is_some_and(|u| u.id == account.id)
}

/// Abandoning an external sign-in is always allowed; it only discards
/// pending state held by the caller.
pub fn cancel(_user: Option<&User>) -> bool {
    true
}
