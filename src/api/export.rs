use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentTeacher;
use crate::core::state::AppState;
use crate::core::time::date_stamp;
use crate::repositories;
use crate::schemas::grade::ReportQuery;
use crate::services::{report, xlsx};

const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/excel", get(grades_workbook)).route("/students/excel", get(roster_workbook))
}

/// Full grade report: the summary sheet followed by one sheet per subject.
async fn grades_workbook(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Query(query): Query<ReportQuery>,
) -> Result<Response, ApiError> {
    let class_name = class_name(&state, teacher.class_id).await?;

    let rows = repositories::grades::report_rows(
        state.db(),
        teacher.class_id,
        query.semester,
        query.academic_year.as_deref(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to load report data"))?;

    let sheets = report::build_grade_report(&rows);
    let bytes = xlsx::workbook_bytes(&sheets)
        .map_err(|e| ApiError::internal(e, "Failed to build workbook"))?;

    let semester_part = query.semester.map(|s| format!("Sem{s}_")).unwrap_or_default();
    let year_part = query
        .academic_year
        .clone()
        .unwrap_or_else(|| time::OffsetDateTime::now_utc().year().to_string());
    let filename = format!(
        "{}.xlsx",
        xlsx::clean_excel_name(&format!(
            "Nilai_Per_Mapel_{class_name}_{semester_part}{year_part}_{}",
            date_stamp()
        ))
    );

    Ok(attachment(bytes, &filename))
}

/// Class roster workbook (No, Nama Siswa, NIS, Tanggal Daftar).
async fn roster_workbook(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
) -> Result<Response, ApiError> {
    let class_name = class_name(&state, teacher.class_id).await?;

    let students = repositories::students::list_by_class(state.db(), teacher.class_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load students"))?;

    let sheet = report::build_student_roster(&students, &class_name);
    let filename =
        format!("{}.xlsx", xlsx::clean_excel_name(&format!("{}_{}", sheet.name, date_stamp())));

    let bytes = xlsx::workbook_bytes(&[sheet])
        .map_err(|e| ApiError::internal(e, "Failed to build workbook"))?;

    Ok(attachment(bytes, &filename))
}

async fn class_name(state: &AppState, class_id: i64) -> Result<String, ApiError> {
    let class = repositories::classes::find_by_id(state.db(), class_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load class"))?;

    Ok(class.map(|class| class.name).unwrap_or_else(|| format!("Kelas {class_id}")))
}

fn attachment(bytes: Vec<u8>, filename: &str) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(XLSX_CONTENT_TYPE));
    if let Ok(value) = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\"")) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    (headers, bytes).into_response()
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use axum::body::to_bytes;
    use axum::http::{header, Method, StatusCode};
    use tower::ServiceExt;
    use zip::ZipArchive;

    use crate::db::types::GradeType;
    use crate::test_support;

    #[tokio::test]
    async fn grade_export_produces_a_readable_workbook() {
        let ctx = test_support::setup_test_context().await;
        let teacher =
            test_support::insert_teacher(ctx.state.db(), "guru", "Guru", "rahasia1", 1).await;
        let student = test_support::insert_student(ctx.state.db(), "Andi", Some("1001"), 1).await;
        let subject = test_support::subject_id_by_name(ctx.state.db(), 1, "Matematika").await;
        test_support::insert_grade(ctx.state.db(), &student.id, &subject, None, 90.0, GradeType::Final)
            .await;
        let token = test_support::bearer_token(&teacher.id, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::GET,
                "/api/export/excel?semester=1&academic_year=2025/2026",
                Some(&token),
                None,
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .expect("content type")
            .to_string();
        assert_eq!(
            content_type,
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );
        let disposition = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .expect("disposition")
            .to_string();
        assert!(disposition.contains("Nilai_Per_Mapel_Kelas 1_Sem1_"));

        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let mut archive = ZipArchive::new(Cursor::new(body.to_vec())).expect("zip archive");
        assert!(archive.by_name("xl/workbook.xml").is_ok());
        // Summary plus one sheet for the single graded subject.
        assert!(archive.by_name("xl/worksheets/sheet1.xml").is_ok());
        assert!(archive.by_name("xl/worksheets/sheet2.xml").is_ok());
    }

    #[tokio::test]
    async fn roster_export_names_the_file_after_the_class() {
        let ctx = test_support::setup_test_context().await;
        let teacher =
            test_support::insert_teacher(ctx.state.db(), "guru", "Guru", "rahasia1", 3).await;
        test_support::insert_student(ctx.state.db(), "Budi", None, 3).await;
        let token = test_support::bearer_token(&teacher.id, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::GET,
                "/api/export/students/excel",
                Some(&token),
                None,
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let disposition = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .expect("disposition")
            .to_string();
        assert!(disposition.contains("Daftar_Siswa_Kelas 3_"));

        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let archive = ZipArchive::new(Cursor::new(body.to_vec())).expect("zip archive");
        assert!(archive.len() > 0);
    }
}
