//! Model file API endpoints
//!
//! Every route resolves the file through its parent model and checks the
//! file policy before touching anything.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use super::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{Model, ModelFile};
use crate::policy::model_file::{self, FileAction, FileResource};

/// Model file routes (authenticated)
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/models/{model_id}/files/{id}",
            get(show_file).delete(delete_file),
        )
        .route("/models/{model_id}/files/{id}/convert", post(convert_file))
        .route("/models/{model_id}/files/{id}/permissions", get(file_permissions))
}

/// Load a file together with its owning model
async fn load(state: &AppState, model_id: i64, id: i64) -> Result<(Model, ModelFile), ApiError> {
    let model = state
        .model_repo
        .get_by_id(model_id)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("Model not found"))?;
    let file = state
        .model_file_repo
        .get(model_id, id)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("File not found"))?;
    Ok((model, file))
}

/// GET /api/v1/models/{model_id}/files/{id}
async fn show_file(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path((model_id, id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    let (model, file) = load(&state, model_id, id).await?;
    model_file::check(
        FileAction::Show,
        Some(&user),
        FileResource {
            file: &file,
            model: &model,
        },
    )?;
    Ok(Json(file))
}

/// DELETE /api/v1/models/{model_id}/files/{id}
async fn delete_file(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path((model_id, id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    let (model, file) = load(&state, model_id, id).await?;
    model_file::check(
        FileAction::Delete,
        Some(&user),
        FileResource {
            file: &file,
            model: &model,
        },
    )?;

    state
        .model_file_repo
        .delete(file.id)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;
    tracing::info!(file_id = file.id, model_id, user_id = user.id, "Model file deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/models/{model_id}/files/{id}/convert
///
/// Accepts the request; conversion itself runs elsewhere.
async fn convert_file(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path((model_id, id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    let (model, file) = load(&state, model_id, id).await?;
    model_file::check(
        FileAction::Convert,
        Some(&user),
        FileResource {
            file: &file,
            model: &model,
        },
    )?;

    tracing::info!(file_id = file.id, model_id, "Model file queued for conversion");
    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "file_id": file.id, "status": "queued" })),
    ))
}

/// GET /api/v1/models/{model_id}/files/{id}/permissions
async fn file_permissions(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path((model_id, id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    let (model, file) = load(&state, model_id, id).await?;
    Ok(Json(model_file::permissions(
        Some(&user),
        FileResource {
            file: &file,
            model: &model,
        },
    )))
}
