use axum::{
    extract::{Path, State},
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
use crate::db::models::Student;
use crate::repositories;
use crate::schemas::grade::GradeResponse;
use crate::schemas::student::{
    StudentCreate, StudentCreatedResponse, StudentDetailResponse, StudentResponse, StudentUpdate,
};
use crate::schemas::MessageResponse;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", get(detail).put(update).delete(remove))
}

async fn list(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
) -> Result<Json<Vec<StudentResponse>>, ApiError> {
    let students = repositories::students::list_by_class(state.db(), teacher.class_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load students"))?;

    Ok(Json(students.into_iter().map(StudentResponse::from_db).collect()))
}

async fn create(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Json(payload): Json<StudentCreate>,
) -> Result<(StatusCode, Json<StudentCreatedResponse>), ApiError> {
    payload.validate().map_err(|e| validation_error(&e))?;

    let nis = payload.nis.as_deref().filter(|nis| !nis.is_empty());

    check_name_unique_in_class(&state, &payload.name, teacher.class_id, None).await?;

    if let Some(nis) = nis {
        check_nis_unused(&state, nis, None).await?;
    }
    check_cross_class_name(&state, &payload.name, teacher.class_id, nis, None).await?;

    let now = primitive_now_utc();
    let student = repositories::students::create(
        state.db(),
        repositories::students::CreateStudent {
            id: &Uuid::new_v4().to_string(),
            name: &payload.name,
            nis,
            class_id: teacher.class_id,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to add student"))?;

    let response = StudentCreatedResponse {
        message: "Student added successfully".to_string(),
        student: StudentResponse::from_db(student),
    };

    Ok((StatusCode::CREATED, Json(response)))
}

async fn update(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Path(id): Path<String>,
    Json(payload): Json<StudentUpdate>,
) -> Result<Json<MessageResponse>, ApiError> {
    payload.validate().map_err(|e| validation_error(&e))?;

    let student = fetch_owned_student(&state, &id, teacher.class_id).await?;
    let nis = payload.nis.as_deref().filter(|nis| !nis.is_empty());

    // Uniqueness is only re-checked for the fields that actually change.
    if payload.name != student.name {
        check_name_unique_in_class(&state, &payload.name, teacher.class_id, Some(&id)).await?;
    }

    if let Some(nis) = nis {
        if student.nis.as_deref() != Some(nis) {
            check_nis_unused(&state, nis, Some(&id)).await?;
        }
    }

    if payload.name != student.name {
        check_cross_class_name(&state, &payload.name, teacher.class_id, nis, Some(&id)).await?;
    }

    repositories::students::update(state.db(), &id, &payload.name, nis, primitive_now_utc())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to update student"))?;

    Ok(Json(MessageResponse { message: "Student updated successfully".to_string() }))
}

async fn remove(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    fetch_owned_student(&state, &id, teacher.class_id).await?;

    repositories::students::delete_with_grades(state.db(), &id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete student"))?;

    Ok(Json(MessageResponse { message: "Student deleted successfully".to_string() }))
}

async fn detail(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Path(id): Path<String>,
) -> Result<Json<StudentDetailResponse>, ApiError> {
    let student = fetch_owned_student(&state, &id, teacher.class_id).await?;

    let grades = repositories::grades::list_for_student_detailed(state.db(), &id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load grades"))?;

    Ok(Json(StudentDetailResponse {
        student: StudentResponse::from_db(student),
        grades: grades.into_iter().map(GradeResponse::from_row).collect(),
    }))
}

async fn fetch_owned_student(
    state: &AppState,
    id: &str,
    class_id: i64,
) -> Result<Student, ApiError> {
    repositories::students::find_in_class(state.db(), id, class_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load student"))?
        .ok_or_else(|| ApiError::NotFound("Student not found or access denied".to_string()))
}

async fn check_name_unique_in_class(
    state: &AppState,
    name: &str,
    class_id: i64,
    exclude_id: Option<&str>,
) -> Result<(), ApiError> {
    let taken =
        repositories::students::name_exists_in_class(state.db(), name, class_id, exclude_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to check student name"))?;

    if taken {
        return Err(ApiError::BadRequest("Nama siswa sudah ada di kelas ini".to_string()));
    }
    Ok(())
}

async fn check_nis_unused(
    state: &AppState,
    nis: &str,
    exclude_id: Option<&str>,
) -> Result<(), ApiError> {
    let taken = repositories::students::nis_exists(state.db(), nis, exclude_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check NIS"))?;

    if taken {
        return Err(ApiError::BadRequest("NIS sudah digunakan".to_string()));
    }
    Ok(())
}

/// The same name in another class is allowed only when a NIS disambiguates
/// the two students.
async fn check_cross_class_name(
    state: &AppState,
    name: &str,
    class_id: i64,
    nis: Option<&str>,
    exclude_id: Option<&str>,
) -> Result<(), ApiError> {
    if nis.is_some() {
        return Ok(());
    }

    let duplicated =
        repositories::students::name_exists_in_other_class(state.db(), name, class_id, exclude_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to check student name"))?;

    if duplicated {
        return Err(ApiError::BadRequest(
            "Nama siswa sudah ada di kelas lain. NIS harus diisi untuk membedakan siswa."
                .to_string(),
        ));
    }
    Ok(())
}
