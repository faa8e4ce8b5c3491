use axum::{extract::State, routing::get, routing::post, Json, Router};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentTeacher;
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::subject::{CleanupResponse, SubjectResponse};

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", get(list)).route("/cleanup", post(cleanup))
}

async fn list(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
) -> Result<Json<Vec<SubjectResponse>>, ApiError> {
    let subjects = repositories::subjects::list_by_class(state.db(), teacher.class_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load subjects"))?;

    Ok(Json(subjects.into_iter().map(SubjectResponse::from_db).collect()))
}

/// Drops duplicate (name, class) rows left over from imports of databases
/// that predate the uniqueness index, keeping the earliest of each group.
async fn cleanup(
    State(state): State<AppState>,
    CurrentTeacher(_teacher): CurrentTeacher,
) -> Result<Json<CleanupResponse>, ApiError> {
    let removed = repositories::subjects::cleanup_duplicates(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to cleanup subjects"))?;

    Ok(Json(CleanupResponse {
        message: "Duplicate subjects cleaned up successfully".to_string(),
        removed,
    }))
}
