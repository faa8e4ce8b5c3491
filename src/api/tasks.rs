use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::{validation_error, ApiError};
use crate::api::guards::CurrentTeacher;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::Task;
use crate::repositories;
use crate::schemas::task::{
    group_tasks_by_subject, SubjectTasksResponse, TaskCreate, TaskCreatedResponse,
    TaskGradesResponse, TaskListQuery, TaskResponse, TaskUpdate,
};
use crate::schemas::MessageResponse;

pub(crate) fn router() -> Router<AppState> {
    // Static segments are registered before the `/:id` capture.
    Router::new()
        .route("/", get(list).post(create))
        .route("/grouped", get(grouped))
        .route("/by-subject/:subject_id", get(by_subject))
        .route("/:id", get(detail).put(update).delete(remove))
        .route("/:id/grades", get(grades))
}

async fn list(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Query(query): Query<TaskListQuery>,
) -> Result<Json<Vec<TaskResponse>>, ApiError> {
    let tasks = repositories::tasks::list_by_class(
        state.db(),
        teacher.class_id,
        query.subject_id.as_deref(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to load tasks"))?;

    Ok(Json(tasks.into_iter().map(TaskResponse::from_joined).collect()))
}

async fn grouped(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
) -> Result<Json<Vec<SubjectTasksResponse>>, ApiError> {
    let rows = repositories::tasks::list_grouped_by_subject(state.db(), teacher.class_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load tasks"))?;

    Ok(Json(group_tasks_by_subject(rows)))
}

async fn by_subject(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Path(subject_id): Path<String>,
) -> Result<Json<Vec<TaskResponse>>, ApiError> {
    verify_subject_ownership(&state, &subject_id, teacher.class_id).await?;

    let tasks = repositories::tasks::list_for_subject(state.db(), &subject_id, teacher.class_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load tasks"))?;

    Ok(Json(tasks.into_iter().map(TaskResponse::from_db).collect()))
}

async fn detail(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Path(id): Path<String>,
) -> Result<Json<TaskResponse>, ApiError> {
    let task = repositories::tasks::find_with_subject(state.db(), &id, teacher.class_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load task"))?
        .ok_or_else(|| ApiError::NotFound("Task not found or access denied".to_string()))?;

    Ok(Json(TaskResponse::from_joined(task)))
}

async fn create(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Json(payload): Json<TaskCreate>,
) -> Result<(StatusCode, Json<TaskCreatedResponse>), ApiError> {
    payload.validate().map_err(|e| validation_error(&e))?;

    verify_subject_ownership(&state, &payload.subject_id, teacher.class_id).await?;

    let now = primitive_now_utc();
    let task = repositories::tasks::create(
        state.db(),
        repositories::tasks::CreateTask {
            id: &Uuid::new_v4().to_string(),
            name: &payload.name,
            description: payload.description.as_deref(),
            subject_id: &payload.subject_id,
            class_id: teacher.class_id,
            due_date: payload.due_date.as_deref(),
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create task"))?;

    let response = TaskCreatedResponse {
        message: "Task created successfully".to_string(),
        task: TaskResponse::from_db(task),
    };

    Ok((StatusCode::CREATED, Json(response)))
}

async fn update(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Path(id): Path<String>,
    Json(payload): Json<TaskUpdate>,
) -> Result<Json<MessageResponse>, ApiError> {
    payload.validate().map_err(|e| validation_error(&e))?;

    fetch_owned_task(&state, &id, teacher.class_id).await?;

    repositories::tasks::update(
        state.db(),
        &id,
        &payload.name,
        payload.description.as_deref(),
        payload.due_date.as_deref(),
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update task"))?;

    Ok(Json(MessageResponse { message: "Task updated successfully".to_string() }))
}

async fn remove(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    fetch_owned_task(&state, &id, teacher.class_id).await?;

    repositories::tasks::delete_with_grades(state.db(), &id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete task"))?;

    Ok(Json(MessageResponse { message: "Task deleted successfully".to_string() }))
}

/// Class roster with each student's grade for the task, when recorded.
async fn grades(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Path(id): Path<String>,
) -> Result<Json<TaskGradesResponse>, ApiError> {
    let task = repositories::tasks::find_with_subject(state.db(), &id, teacher.class_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load task"))?
        .ok_or_else(|| ApiError::NotFound("Task not found or access denied".to_string()))?;

    let students = repositories::tasks::roster_with_grades(state.db(), &id, teacher.class_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load grades"))?;

    Ok(Json(TaskGradesResponse { task: TaskResponse::from_joined(task), students }))
}

async fn fetch_owned_task(state: &AppState, id: &str, class_id: i64) -> Result<Task, ApiError> {
    repositories::tasks::find_in_class(state.db(), id, class_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load task"))?
        .ok_or_else(|| ApiError::NotFound("Task not found or access denied".to_string()))
}

async fn verify_subject_ownership(
    state: &AppState,
    subject_id: &str,
    class_id: i64,
) -> Result<(), ApiError> {
    repositories::subjects::find_in_class(state.db(), subject_id, class_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load subject"))?
        .ok_or_else(|| ApiError::NotFound("Subject not found or access denied".to_string()))?;
    Ok(())
}
