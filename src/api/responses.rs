//! Shared API response types
//!
//! Account flows answer with where the browser should go next and a
//! notice key, the JSON equivalent of a redirect with a flash message.

use serde::Serialize;

use crate::models::User;

/// Outcome of an account flow
#[derive(Debug, Serialize)]
pub struct RedirectResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    pub redirect_to: &'static str,
    pub notice: &'static str,
}

/// Response for a successful sign-in
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}
