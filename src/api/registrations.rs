//! Registration API endpoints
//!
//! Sign-up, account management and session routes under `/users`.
//! Every route here runs behind `optional_auth`; handlers that need an
//! account take `AuthenticatedUser` and reject anonymous callers themselves.
//! First-use accounts are allowed through so they can finish setup.

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect},
    middleware as axum_middleware,
    routing::{delete, get, post},
    Json, Router,
};

use super::middleware::{
    self, extract_session_token, ApiError, AppState, AuthenticatedUser, CurrentUser,
};
use super::responses::{AuthResponse, RedirectResponse};
use crate::models::Session;
use crate::services::registration::{
    notices, paths, AccountUpdate, AccountView, RegistrationError, SignUpInput, SignUpOutcome,
};
use crate::services::LoginInput;

/// Cookie carrying an in-progress external sign-in
const OAUTH_PENDING_COOKIE: &str = "oauth_pending";

/// Registration and session routes
///
/// Create and cancel are delayed by a layer on their method routers only;
/// methods chained after `route_layer` are not wrapped.
pub fn router(state: AppState) -> Router<AppState> {
    let delay = axum_middleware::from_fn_with_state(state, middleware::request_delay);

    Router::new()
        .route("/users/sign_up", get(new_registration))
        .route(
            "/users",
            post(create_registration)
                .route_layer(delay.clone())
                .put(update_registration)
                .delete(destroy_registration),
        )
        .route("/users/edit", get(edit_registration))
        .route("/users/cancel", get(cancel_registration).route_layer(delay))
        .route("/users/sign_in", post(sign_in))
        .route("/users/sign_out", delete(sign_out))
}

fn session_cookie(session: &Session) -> String {
    format!(
        "session={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        session.id,
        session.max_age_seconds()
    )
}

fn expired_cookie(name: &str) -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", name)
}

fn set_cookie(headers: &mut HeaderMap, cookie: &str) -> Result<(), ApiError> {
    let value = HeaderValue::from_str(cookie)
        .map_err(|_| ApiError::internal_error("Invalid cookie value"))?;
    headers.append(header::SET_COOKIE, value);
    Ok(())
}

/// GET /api/v1/users/sign_up - Sign-up form
async fn new_registration(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let form = state.registration_service.new_form(current.as_ref()).await?;
    Ok(Json(form))
}

/// POST /api/v1/users - Create an account
async fn create_registration(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    Json(body): Json<SignUpInput>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .registration_service
        .sign_up(current.as_ref(), body)
        .await?;

    let mut response_headers = HeaderMap::new();
    let body = match outcome {
        SignUpOutcome::SignedIn { user, session } => {
            set_cookie(&mut response_headers, &session_cookie(&session))?;
            RedirectResponse {
                user: Some(user),
                redirect_to: paths::ROOT,
                notice: notices::SIGNED_UP,
            }
        }
        SignUpOutcome::AwaitingApproval { user } => RedirectResponse {
            user: Some(user),
            redirect_to: paths::ROOT,
            notice: notices::AWAITING_APPROVAL,
        },
    };

    Ok((StatusCode::CREATED, response_headers, Json(body)))
}

/// GET /api/v1/users/edit - Account form (`edit` or `first_use` view)
async fn edit_registration(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let view = state.registration_service.edit(&user)?;
    Ok(Json(view))
}

/// PUT /api/v1/users - Update the signed-in account
///
/// Validation failures name the view to re-render alongside the errors.
async fn update_registration(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(body): Json<AccountUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = match state.registration_service.update(&user, body).await {
        Ok(outcome) => outcome,
        Err(RegistrationError::Invalid(errors)) => {
            return Err(ApiError::with_details(
                "VALIDATION_ERROR",
                "Validation failed",
                serde_json::json!({
                    "view": AccountView::for_account(&user),
                    "errors": errors,
                }),
            ));
        }
        Err(e) => return Err(e.into()),
    };

    let mut response_headers = HeaderMap::new();
    if let Some(session) = &outcome.session {
        set_cookie(&mut response_headers, &session_cookie(session))?;
    }

    Ok((
        response_headers,
        Json(RedirectResponse {
            user: Some(outcome.user),
            redirect_to: outcome.redirect_to,
            notice: outcome.notice,
        }),
    ))
}

/// DELETE /api/v1/users - Delete the signed-in account
async fn destroy_registration(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    state.registration_service.destroy(&user).await?;

    let mut response_headers = HeaderMap::new();
    set_cookie(&mut response_headers, &expired_cookie("session"))?;

    Ok((
        response_headers,
        Json(RedirectResponse {
            user: None,
            redirect_to: paths::ROOT,
            notice: notices::DESTROYED,
        }),
    ))
}

/// GET /api/v1/users/cancel - Abandon an in-progress external sign-in
async fn cancel_registration(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let redirect_to = state.registration_service.cancel(current.as_ref())?;

    let mut response_headers = HeaderMap::new();
    set_cookie(&mut response_headers, &expired_cookie(OAUTH_PENDING_COOKIE))?;

    Ok((response_headers, Redirect::to(redirect_to)))
}

/// POST /api/v1/users/sign_in - Sign in with username or email
async fn sign_in(
    State(state): State<AppState>,
    Json(body): Json<LoginInput>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.user_service.login(body).await.map_err(|e| {
        tracing::info!(reason = %e, "Sign-in rejected");
        ApiError::from(e)
    })?;
    let user = state.user_service.validate_session(&session.id).await?;

    let mut response_headers = HeaderMap::new();
    set_cookie(&mut response_headers, &session_cookie(&session))?;

    Ok((
        response_headers,
        Json(AuthResponse {
            user,
            token: session.id,
        }),
    ))
}

/// DELETE /api/v1/users/sign_out - End the current session
async fn sign_out(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = extract_session_token(&headers)
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    state.user_service.logout(&token).await?;

    let mut response_headers = HeaderMap::new();
    set_cookie(&mut response_headers, &expired_cookie("session"))?;

    Ok((StatusCode::NO_CONTENT, response_headers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn test_session_cookie_format() {
        let session = Session {
            id: "abc".to_string(),
            user_id: 1,
            expires_at: Utc::now() + Duration::days(1),
            created_at: Utc::now(),
        };
        let cookie = session_cookie(&session);
        assert!(cookie.starts_with("session=abc; Path=/; HttpOnly; SameSite=Lax; Max-Age="));
        assert_eq!(
            expired_cookie(OAUTH_PENDING_COOKIE),
            "oauth_pending=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"
        );
    }
}
