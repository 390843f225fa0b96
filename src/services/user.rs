//! User service
//!
//! Authentication and session management:
//! - sign in with username or email and password
//! - bypass sign-in after a flow that already proved account control
//! - sign out and session validation

use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{Session, User};
use crate::services::password::verify_password;
use anyhow::Context;
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Default session expiration time in days
const DEFAULT_SESSION_EXPIRATION_DAYS: i64 = 7;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Authentication failed (invalid credentials)
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// Account exists but has not been approved yet
    #[error("Account is awaiting approval")]
    NotApproved,

    #[error("Session expired")]
    SessionExpired,

    #[error("Session not found")]
    SessionNotFound,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Credentials submitted to the sign-in endpoint
#[derive(Debug, Clone, serde::Deserialize)]
pub struct LoginInput {
    /// Username or email
    pub login: String,
    pub password: String,
}

/// User service for authentication and sessions
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_expiration_days: i64,
}

impl UserService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
    ) -> Self {
        Self::with_session_expiration(user_repo, session_repo, DEFAULT_SESSION_EXPIRATION_DAYS)
    }

    pub fn with_session_expiration(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        session_expiration_days: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            session_expiration_days,
        }
    }

    /// Sign in with credentials, returning a new session.
    ///
    /// Unknown accounts and wrong passwords produce the same error.
    pub async fn login(&self, input: LoginInput) -> Result<Session, UserServiceError> {
        let invalid =
            || UserServiceError::AuthenticationError("Invalid login or password".to_string());

        let user = self
            .find_by_login(&input.login)
            .await?
            .ok_or_else(invalid)?;

        let password_valid = verify_password(&input.password, &user.password_hash)
            .context("Failed to verify password")?;
        if !password_valid {
            tracing::debug!(user_id = user.id, "Sign-in rejected: wrong password");
            return Err(invalid());
        }

        self.sign_in(&user).await
    }

    /// Establish a session without checking credentials.
    ///
    /// Callers must already have proven control of the account.
    pub async fn sign_in(&self, user: &User) -> Result<Session, UserServiceError> {
        if !user.is_active_for_authentication() {
            return Err(UserServiceError::NotApproved);
        }

        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id: user.id,
            expires_at: now + Duration::days(self.session_expiration_days),
            created_at: now,
        };

        let created = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;
        tracing::info!(user_id = user.id, "User signed in");
        Ok(created)
    }

    /// Invalidate one session
    pub async fn logout(&self, session_id: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(session_id)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Invalidate every session of an account
    pub async fn logout_everywhere(&self, user_id: i64) -> Result<(), UserServiceError> {
        self.session_repo
            .delete_by_user(user_id)
            .await
            .context("Failed to delete user sessions")?;
        Ok(())
    }

    /// Resolve a session token to its account.
    ///
    /// Expired sessions are deleted on sight.
    pub async fn validate_session(&self, session_id: &str) -> Result<User, UserServiceError> {
        let session = self
            .session_repo
            .get_by_id(session_id)
            .await
            .context("Failed to get session")?
            .ok_or(UserServiceError::SessionNotFound)?;

        if session.is_expired() {
            self.session_repo
                .delete(session_id)
                .await
                .context("Failed to delete expired session")?;
            return Err(UserServiceError::SessionExpired);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?
            .ok_or(UserServiceError::SessionNotFound)?;

        if !user.is_active_for_authentication() {
            return Err(UserServiceError::NotApproved);
        }

        Ok(user)
    }

    /// Remove expired sessions, returning how many were deleted
    pub async fn cleanup_expired_sessions(&self) -> Result<i64, UserServiceError> {
        Ok(self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to clean up sessions")?)
    }

    async fn find_by_login(&self, login: &str) -> Result<Option<User>, UserServiceError> {
        let user = if login.contains('@') {
            self.user_repo.get_by_email(login).await
        } else {
            self.user_repo.get_by_username(login).await
        }
        .context("Failed to look up user")?;
        Ok(user)
    }
}
