//! Federation admin endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};

use super::middleware::{ApiError, AppState};

/// Federation routes (admin only)
pub fn router() -> Router<AppState> {
    Router::new().route("/admin/federation/actors/{id}/model", post(create_model_from_actor))
}

/// POST /api/v1/admin/federation/actors/{id}/model - Map a stored actor to a new model
async fn create_model_from_actor(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let model = state.federation_service.create_model_for_actor(id).await?;
    Ok((StatusCode::CREATED, Json(model)))
}
