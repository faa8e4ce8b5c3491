use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentTeacher;
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::grade::{
    BulkErrorResponse, BulkFailure, BulkGradesRequest, BulkOkResponse, GradeListQuery,
    GradeResponse, GradeSavedResponse, GradeSubmission, StudentSummaryResponse,
};
use crate::schemas::student::StudentResponse;
use crate::schemas::MessageResponse;
use crate::services::reconcile::{self, ReconcileError};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(save))
        .route("/bulk", post(save_bulk))
        .route("/:id", delete(remove))
        .route("/student/:student_id/summary", get(student_summary))
}

async fn save(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Json(payload): Json<GradeSubmission>,
) -> Result<Response, ApiError> {
    let outcome = reconcile::reconcile_submission(state.db(), teacher.class_id, &payload)
        .await
        .map_err(map_reconcile_error)?;

    let (status, message) = if outcome.inserted {
        (StatusCode::CREATED, "Grade added successfully")
    } else {
        (StatusCode::OK, "Grade updated successfully")
    };

    let body =
        GradeSavedResponse { message: message.to_string(), grade_id: outcome.grade_id };

    Ok((status, Json(body)).into_response())
}

async fn save_bulk(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Json(payload): Json<BulkGradesRequest>,
) -> Result<Response, ApiError> {
    if payload.grades.is_empty() {
        return Err(ApiError::BadRequest("Data nilai tidak valid".to_string()));
    }

    let outcome = reconcile::reconcile_bulk(state.db(), teacher.class_id, &payload.grades).await;

    if outcome.failures.is_empty() {
        let body = BulkOkResponse {
            message: format!("Berhasil memproses {} nilai", outcome.processed),
            processed: outcome.processed,
        };
        return Ok(Json(body).into_response());
    }

    let body = BulkErrorResponse {
        error: "Beberapa nilai gagal disimpan".to_string(),
        details: outcome
            .failures
            .into_iter()
            .map(|(index, error)| BulkFailure { index, error })
            .collect(),
        processed: outcome.processed,
    };

    Ok((StatusCode::BAD_REQUEST, Json(body)).into_response())
}

async fn list(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Query(query): Query<GradeListQuery>,
) -> Result<Json<Vec<GradeResponse>>, ApiError> {
    let filter = repositories::grades::GradeFilter {
        semester: query.semester,
        academic_year: query.academic_year.as_deref(),
        subject_id: query.subject_id.as_deref(),
        grade_type: query.grade_type,
    };

    let grades = repositories::grades::list_for_class(state.db(), teacher.class_id, filter)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load grades"))?;

    Ok(Json(grades.into_iter().map(GradeResponse::from_row).collect()))
}

async fn remove(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let deleted = repositories::grades::delete_scoped(state.db(), &id, teacher.class_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete grade"))?;

    if !deleted {
        return Err(ApiError::NotFound("Grade not found or access denied".to_string()));
    }

    Ok(Json(MessageResponse { message: "Grade deleted successfully".to_string() }))
}

async fn student_summary(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Path(student_id): Path<String>,
) -> Result<Json<StudentSummaryResponse>, ApiError> {
    let student = repositories::students::find_in_class(state.db(), &student_id, teacher.class_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load student"))?
        .ok_or_else(|| ApiError::NotFound("Student not found or access denied".to_string()))?;

    let grades = repositories::grades::list_for_student(state.db(), &student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load grades"))?;

    Ok(Json(StudentSummaryResponse { student: StudentResponse::from_db(student), grades }))
}

fn map_reconcile_error(err: ReconcileError) -> ApiError {
    match err {
        ReconcileError::MissingFields | ReconcileError::OutOfRange => {
            ApiError::BadRequest(err.to_string())
        }
        ReconcileError::StudentNotFound => {
            ApiError::NotFound("Student not found or access denied".to_string())
        }
        ReconcileError::SubjectNotFound => {
            ApiError::NotFound("Subject not found or access denied".to_string())
        }
        ReconcileError::TaskMismatch => {
            ApiError::NotFound("Task not found or access denied".to_string())
        }
        ReconcileError::Db(db_err) => ApiError::internal(db_err, "Failed to save grade"),
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::db::types::GradeType;
    use crate::test_support;

    #[tokio::test]
    async fn save_inserts_then_updates_the_same_row() {
        let ctx = test_support::setup_test_context().await;
        let teacher =
            test_support::insert_teacher(ctx.state.db(), "guru", "Guru", "rahasia1", 1).await;
        let student = test_support::insert_student(ctx.state.db(), "Andi", None, 1).await;
        let subject = test_support::subject_id_by_name(ctx.state.db(), 1, "Matematika").await;
        let token = test_support::bearer_token(&teacher.id, ctx.state.settings());

        let payload = json!({
            "student_id": student.id,
            "subject_id": subject,
            "grade_value": 80.0,
            "semester": 1,
            "academic_year": "2025/2026"
        });

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/grades",
                Some(&token),
                Some(payload.clone()),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::CREATED);
        let first = test_support::read_json(response).await;
        assert_eq!(first["message"], "Grade added successfully");

        let mut updated = payload;
        updated["grade_value"] = json!(95.0);
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/grades",
                Some(&token),
                Some(updated),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let second = test_support::read_json(response).await;
        assert_eq!(second["message"], "Grade updated successfully");
        assert_eq!(second["gradeId"], first["gradeId"]);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM grades")
            .fetch_one(ctx.state.db())
            .await
            .expect("count");
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn save_rejects_out_of_range_values() {
        let ctx = test_support::setup_test_context().await;
        let teacher =
            test_support::insert_teacher(ctx.state.db(), "guru", "Guru", "rahasia1", 1).await;
        let student = test_support::insert_student(ctx.state.db(), "Andi", None, 1).await;
        let subject = test_support::subject_id_by_name(ctx.state.db(), 1, "Matematika").await;
        let token = test_support::bearer_token(&teacher.id, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/grades",
                Some(&token),
                Some(json!({
                    "student_id": student.id,
                    "subject_id": subject,
                    "grade_value": 101.0,
                    "semester": 1,
                    "academic_year": "2025/2026"
                })),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = test_support::read_json(response).await;
        assert_eq!(json["error"], "grade must be between 0 and 100");
    }

    #[tokio::test]
    async fn save_rejects_a_zero_semester() {
        let ctx = test_support::setup_test_context().await;
        let teacher =
            test_support::insert_teacher(ctx.state.db(), "guru", "Guru", "rahasia1", 1).await;
        let student = test_support::insert_student(ctx.state.db(), "Andi", None, 1).await;
        let subject = test_support::subject_id_by_name(ctx.state.db(), 1, "Matematika").await;
        let token = test_support::bearer_token(&teacher.id, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/grades",
                Some(&token),
                Some(json!({
                    "student_id": student.id,
                    "subject_id": subject,
                    "grade_value": 80.0,
                    "semester": 0,
                    "academic_year": "2025/2026"
                })),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = test_support::read_json(response).await;
        assert_eq!(
            json["error"],
            "required fields: student_id, subject_id, grade_value, semester, academic_year"
        );
    }

    #[tokio::test]
    async fn save_scopes_students_to_the_teachers_class() {
        let ctx = test_support::setup_test_context().await;
        let teacher =
            test_support::insert_teacher(ctx.state.db(), "guru", "Guru", "rahasia1", 1).await;
        let foreign = test_support::insert_student(ctx.state.db(), "Andi", None, 2).await;
        let subject = test_support::subject_id_by_name(ctx.state.db(), 1, "Matematika").await;
        let token = test_support::bearer_token(&teacher.id, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/grades",
                Some(&token),
                Some(json!({
                    "student_id": foreign.id,
                    "subject_id": subject,
                    "grade_value": 80.0,
                    "semester": 1,
                    "academic_year": "2025/2026"
                })),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = test_support::read_json(response).await;
        assert_eq!(json["error"], "Student not found or access denied");
    }

    #[tokio::test]
    async fn bulk_reports_per_item_failures() {
        let ctx = test_support::setup_test_context().await;
        let teacher =
            test_support::insert_teacher(ctx.state.db(), "guru", "Guru", "rahasia1", 1).await;
        let student = test_support::insert_student(ctx.state.db(), "Andi", None, 1).await;
        let subject = test_support::subject_id_by_name(ctx.state.db(), 1, "Matematika").await;
        let token = test_support::bearer_token(&teacher.id, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/grades/bulk",
                Some(&token),
                Some(json!({"grades": [
                    {
                        "student_id": student.id,
                        "subject_id": subject,
                        "grade_value": 80.0,
                        "semester": 1,
                        "academic_year": "2025/2026"
                    },
                    {
                        "student_id": student.id,
                        "subject_id": subject,
                        "grade_value": 250.0,
                        "semester": 1,
                        "academic_year": "2025/2026",
                        "grade_type": "task"
                    },
                    {
                        "subject_id": subject,
                        "grade_value": 70.0
                    }
                ]})),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = test_support::read_json(response).await;
        assert_eq!(json["error"], "Beberapa nilai gagal disimpan");
        assert_eq!(json["processed"], 1);
        let details = json["details"].as_array().expect("details");
        assert_eq!(details.len(), 2);
        assert_eq!(details[0]["index"], 2);
        assert_eq!(details[0]["error"], "Nilai harus antara 0-100");
        assert_eq!(details[1]["index"], 3);
        assert_eq!(details[1]["error"], "Data tidak lengkap");
    }

    #[tokio::test]
    async fn bulk_rejects_an_empty_batch() {
        let ctx = test_support::setup_test_context().await;
        let teacher =
            test_support::insert_teacher(ctx.state.db(), "guru", "Guru", "rahasia1", 1).await;
        let token = test_support::bearer_token(&teacher.id, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/grades/bulk",
                Some(&token),
                Some(json!({"grades": []})),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = test_support::read_json(response).await;
        assert_eq!(json["error"], "Data nilai tidak valid");
    }

    #[tokio::test]
    async fn list_filters_by_semester_and_type() {
        let ctx = test_support::setup_test_context().await;
        let teacher =
            test_support::insert_teacher(ctx.state.db(), "guru", "Guru", "rahasia1", 1).await;
        let student = test_support::insert_student(ctx.state.db(), "Andi", None, 1).await;
        let subject = test_support::subject_id_by_name(ctx.state.db(), 1, "Matematika").await;
        let task = test_support::insert_task(ctx.state.db(), "PR 1", &subject, 1).await;
        test_support::insert_grade(
            ctx.state.db(),
            &student.id,
            &subject,
            Some(&task.id),
            85.0,
            GradeType::Task,
        )
        .await;
        test_support::insert_grade(ctx.state.db(), &student.id, &subject, None, 90.0, GradeType::Final)
            .await;
        let token = test_support::bearer_token(&teacher.id, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::GET,
                "/api/grades?semester=1&grade_type=final",
                Some(&token),
                None,
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = test_support::read_json(response).await;
        let grades = json.as_array().expect("array");
        assert_eq!(grades.len(), 1);
        assert_eq!(grades[0]["grade_type"], "final");
        assert_eq!(grades[0]["subject_name"], "Matematika");
    }

    #[tokio::test]
    async fn delete_is_scoped_to_the_class() {
        let ctx = test_support::setup_test_context().await;
        let teacher =
            test_support::insert_teacher(ctx.state.db(), "guru", "Guru", "rahasia1", 1).await;
        let foreign = test_support::insert_student(ctx.state.db(), "Andi", None, 2).await;
        let subject = test_support::subject_id_by_name(ctx.state.db(), 2, "Matematika").await;
        let grade_id = test_support::insert_grade(
            ctx.state.db(),
            &foreign.id,
            &subject,
            None,
            90.0,
            GradeType::Final,
        )
        .await;
        let token = test_support::bearer_token(&teacher.id, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::DELETE,
                &format!("/api/grades/{grade_id}"),
                Some(&token),
                None,
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = test_support::read_json(response).await;
        assert_eq!(json["error"], "Grade not found or access denied");
    }

    #[tokio::test]
    async fn student_summary_lists_their_grades() {
        let ctx = test_support::setup_test_context().await;
        let teacher =
            test_support::insert_teacher(ctx.state.db(), "guru", "Guru", "rahasia1", 1).await;
        let student = test_support::insert_student(ctx.state.db(), "Andi", None, 1).await;
        let subject = test_support::subject_id_by_name(ctx.state.db(), 1, "Matematika").await;
        test_support::insert_grade(ctx.state.db(), &student.id, &subject, None, 88.0, GradeType::Final)
            .await;
        let token = test_support::bearer_token(&teacher.id, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::GET,
                &format!("/api/grades/student/{}/summary", student.id),
                Some(&token),
                None,
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = test_support::read_json(response).await;
        assert_eq!(json["student"]["name"], "Andi");
        let grades = json["grades"].as_array().expect("grades");
        assert_eq!(grades.len(), 1);
        assert_eq!(grades[0]["grade_value"], 88.0);
    }
}
