//! API middleware
//!
//! Contains middleware for:
//! - Authentication (session token validation)
//! - The random delay on sign-up and cancel
//! - The first-use guard (accounts that still have to finish setup)
//! - Authorization (administrator routes)
//!
//! and the shared `AppState` / `ApiError` types used by every handler.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;

use crate::config::{Config, SecurityConfig};
use crate::db::repositories::{
    ModelFileRepository, ModelRepository, SqlxActorRepository, SqlxModelFileRepository,
    SqlxModelRepository, SqlxSessionRepository, SqlxSettingsRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::models::User;
use crate::policy::PolicyError;
use crate::services::delay::random_delay;
use crate::services::registration::{paths, RegistrationError};
use crate::services::{
    FederationError, FederationService, RegistrationService, SettingsService, UserService,
    UserServiceError,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub security: SecurityConfig,
    pub user_service: Arc<UserService>,
    pub settings_service: Arc<SettingsService>,
    pub registration_service: Arc<RegistrationService>,
    pub federation_service: Arc<FederationService>,
    pub model_repo: Arc<dyn ModelRepository>,
    pub model_file_repo: Arc<dyn ModelFileRepository>,
}

impl AppState {
    /// Wire repositories and services over one pool
    pub fn new(pool: DynDatabasePool, config: &Config) -> Self {
        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let session_repo = SqlxSessionRepository::boxed(pool.clone());
        let settings_repo = SqlxSettingsRepository::boxed(pool.clone());
        let actor_repo = SqlxActorRepository::boxed(pool.clone());
        let model_repo = SqlxModelRepository::boxed(pool.clone());
        let model_file_repo = SqlxModelFileRepository::boxed(pool.clone());

        let user_service = Arc::new(UserService::with_session_expiration(
            user_repo.clone(),
            session_repo,
            config.security.session_days,
        ));
        let settings_service = Arc::new(SettingsService::new(settings_repo));
        let registration_service = Arc::new(RegistrationService::new(
            user_repo,
            user_service.clone(),
            settings_service.clone(),
        ));
        let federation_service = Arc::new(FederationService::new(actor_repo, model_repo.clone()));

        Self {
            pool,
            security: config.security,
            user_service,
            settings_service,
            registration_service,
            federation_service,
            model_repo,
            model_file_repo,
        }
    }
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// The signed-in account, if any. Never rejects.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<User>);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(CurrentUser(
            parts
                .extensions
                .get::<AuthenticatedUser>()
                .map(|au| au.0.clone()),
        ))
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    /// The account must finish first-use setup before anything else
    pub fn setup_required() -> Self {
        Self::with_details(
            "SETUP_REQUIRED",
            "Account setup must be completed first",
            serde_json::json!({ "redirect_to": paths::EDIT }),
        )
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::UNPROCESSABLE_ENTITY,
            "SETUP_REQUIRED" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<PolicyError> for ApiError {
    fn from(e: PolicyError) -> Self {
        ApiError::forbidden(e.to_string())
    }
}

impl From<RegistrationError> for ApiError {
    fn from(e: RegistrationError) -> Self {
        match e {
            RegistrationError::Forbidden(e) => e.into(),
            RegistrationError::Invalid(errors) => ApiError::with_details(
                "VALIDATION_ERROR",
                "Validation failed",
                serde_json::json!({ "errors": errors }),
            ),
            RegistrationError::InternalError(e) => {
                tracing::error!(error = %e, "Registration request failed");
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

impl From<FederationError> for ApiError {
    fn from(e: FederationError) -> Self {
        match e {
            FederationError::UnexpectedObject(_) => ApiError::validation_error(e.to_string()),
            FederationError::ActorNotFound => ApiError::not_found("Actor not found"),
            FederationError::InternalError(e) => {
                tracing::error!(error = %e, "Federation request failed");
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

impl From<UserServiceError> for ApiError {
    fn from(e: UserServiceError) -> Self {
        match e {
            UserServiceError::AuthenticationError(msg) => ApiError::unauthorized(msg),
            UserServiceError::NotApproved => ApiError::unauthorized(e.to_string()),
            UserServiceError::SessionExpired | UserServiceError::SessionNotFound => {
                ApiError::unauthorized("Invalid or expired session")
            }
            UserServiceError::InternalError(e) => {
                tracing::error!(error = %e, "User service failure");
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

/// Session token from `Authorization: Bearer` or the `session` cookie
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.to_string());
            }
        }
    }

    if let Some(cookie_header) = headers.get(header::COOKIE) {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for cookie in cookie_str.split(';') {
                let cookie = cookie.trim();
                if let Some(token) = cookie.strip_prefix("session=") {
                    if !token.is_empty() {
                        return Some(token.to_string());
                    }
                }
            }
        }
    }

    None
}

/// Authentication middleware
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_session_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    let user = state.user_service.validate_session(&token).await?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// Optional authentication middleware
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = extract_session_token(request.headers()) {
        match state.user_service.validate_session(&token).await {
            Ok(user) => {
                request.extensions_mut().insert(AuthenticatedUser(user));
            }
            Err(UserServiceError::InternalError(e)) => {
                tracing::warn!(error = %e, "Session lookup failed; continuing signed out");
            }
            Err(_) => {}
        }
    }
    next.run(request).await
}

/// Random delay before the request is handled, including requests the
/// handler's extractors reject.
pub async fn request_delay(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    random_delay(&state.security).await;
    next.run(request).await
}

/// First-use guard. Must run after `require_auth`.
pub async fn require_setup_complete(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if user.0.is_first_use() {
        return Err(ApiError::setup_required());
    }

    Ok(next.run(request).await)
}

/// Admin authorization middleware
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if !user.0.is_administrator() {
        return Err(ApiError::forbidden("Admin privileges required"));
    }

    Ok(next.run(request).await)
}
