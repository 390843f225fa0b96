//! API layer - HTTP handlers and routing
//!
//! All endpoints live under `/api/v1`:
//! - Registration and session endpoints (`/users/...`)
//! - Model file endpoints (`/models/{model_id}/files/{id}/...`)
//! - Federation admin endpoints (`/admin/federation/...`)

pub mod federation;
pub mod files;
pub mod middleware;
pub mod registrations;
pub mod responses;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use middleware::{ApiError, AppState, AuthenticatedUser, CurrentUser};

/// Build the main API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Admin routes (need admin role and finished setup)
    let admin_routes = federation::router()
        .route_layer(axum_middleware::from_fn(middleware::require_admin))
        .route_layer(axum_middleware::from_fn(middleware::require_setup_complete))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Protected routes (need auth and finished setup)
    let protected_routes = files::router()
        .route_layer(axum_middleware::from_fn(middleware::require_setup_complete))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Registration routes resolve the caller themselves; first-use accounts pass
    registrations::router(state.clone())
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::optional_auth,
        ))
        .merge(admin_routes)
        .merge(protected_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let router = Router::new().nest("/api/v1", build_api_router(state.clone()));

    let router = match cors_origin.parse::<HeaderValue>() {
        Ok(origin) => router.layer(
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
                .allow_credentials(true),
        ),
        Err(_) => {
            tracing::warn!(cors_origin, "Invalid CORS origin; cross-origin requests disabled");
            router
        }
    };

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
