//! User model
//!
//! Accounts, their roles and the per-account settings groups.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use super::settings::{FileListSettings, PaginationSettings, RendererSettings, TagCloudSettings};

/// Reset token value marking an account that has not finished initial setup.
pub const FIRST_USE_TOKEN: &str = "first_use";

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Username (unique)
    pub username: String,
    /// Email address (unique)
    pub email: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// One-time reset token; doubles as the first-use marker
    #[serde(skip_serializing)]
    pub reset_password_token: Option<String>,
    /// User role
    pub role: UserRole,
    /// Whether an administrator has approved the account
    pub approved: bool,
    /// Preferred interface locale; `None` means autodetect
    pub interface_language: Option<String>,
    /// How sensitive content is presented (opaque to this service)
    pub sensitive_content_handling: Option<String>,
    pub pagination_settings: Option<PaginationSettings>,
    pub tag_cloud_settings: Option<TagCloudSettings>,
    pub file_list_settings: Option<FileListSettings>,
    pub renderer_settings: Option<RendererSettings>,
    /// Per-category problem reporting levels, stored as submitted
    pub problem_settings: Option<HashMap<String, String>>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new approved user without settings.
    ///
    /// The password must already be hashed, see `services::password::hash_password()`.
    pub fn new(username: String, email: String, password_hash: String, role: UserRole) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Will be set by the database
            username,
            email,
            password_hash,
            reset_password_token: None,
            role,
            approved: true,
            interface_language: None,
            sensitive_content_handling: None,
            pagination_settings: None,
            tag_cloud_settings: None,
            file_list_settings: None,
            renderer_settings: None,
            problem_settings: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// True iff the reset token is exactly the first-use marker.
    pub fn is_first_use(&self) -> bool {
        self.reset_password_token.as_deref() == Some(FIRST_USE_TOKEN)
    }

    /// Whether the account may hold a session
    pub fn is_active_for_authentication(&self) -> bool {
        self.approved
    }

    pub fn is_administrator(&self) -> bool {
        self.role == UserRole::Administrator
    }

    /// Roles allowed to change library content
    pub fn is_contributor(&self) -> bool {
        matches!(
            self.role,
            UserRole::Administrator | UserRole::Moderator | UserRole::Contributor
        )
    }
}

/// User role for authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Full access, including site settings
    Administrator,
    /// Can manage content and other accounts' content
    Moderator,
    /// Can add and edit library content
    Contributor,
    /// Read-only access
    #[default]
    Member,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Administrator => write!(f, "administrator"),
            UserRole::Moderator => write!(f, "moderator"),
            UserRole::Contributor => write!(f, "contributor"),
            UserRole::Member => write!(f, "member"),
        }
    }
}

impl FromStr for UserRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "administrator" => Ok(UserRole::Administrator),
            "moderator" => Ok(UserRole::Moderator),
            "contributor" => Ok(UserRole::Contributor),
            "member" => Ok(UserRole::Member),
            _ => Err(anyhow::anyhow!("Invalid user role: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with_token(token: Option<&str>) -> User {
        let mut user = User::new(
            "maker".to_string(),
            "maker@example.com".to_string(),
            "hash".to_string(),
            UserRole::Member,
        );
        user.reset_password_token = token.map(str::to_string);
        user
    }

    #[test]
    fn test_first_use_requires_exact_token() {
        assert!(user_with_token(Some("first_use")).is_first_use());

        assert!(!user_with_token(None).is_first_use());
        assert!(!user_with_token(Some("First_use")).is_first_use());
        assert!(!user_with_token(Some("first_used")).is_first_use());
        assert!(!user_with_token(Some(" first_use")).is_first_use());
        assert!(!user_with_token(Some("")).is_first_use());
    }

    #[test]
    fn test_new_user_is_approved_and_bare() {
        let user = user_with_token(None);
        assert_eq!(user.id, 0);
        assert!(user.approved);
        assert!(user.pagination_settings.is_none());
        assert!(user.renderer_settings.is_none());
    }

    #[test]
    fn test_contributor_roles() {
        let mut user = user_with_token(None);
        for (role, expected) in [
            (UserRole::Administrator, true),
            (UserRole::Moderator, true),
            (UserRole::Contributor, true),
            (UserRole::Member, false),
        ] {
            user.role = role;
            assert_eq!(user.is_contributor(), expected, "{}", role);
        }
    }

    #[test]
    fn test_user_role_roundtrip() {
        for role in [
            UserRole::Administrator,
            UserRole::Moderator,
            UserRole::Contributor,
            UserRole::Member,
        ] {
            assert_eq!(UserRole::from_str(&role.to_string()).unwrap(), role);
        }
        assert_eq!(UserRole::from_str("MEMBER").unwrap(), UserRole::Member);
        assert!(UserRole::from_str("owner").is_err());
    }
}
