use serde::{Deserialize, Serialize};

use crate::core::time::format_primitive;
use crate::db::types::GradeType;
use crate::repositories::grades::{GradeWithNames, StudentGradeRow};
use crate::schemas::student::StudentResponse;

/// One grade entry as submitted by a client. Every field is optional on
/// the wire so that incomplete items surface as domain errors rather than
/// deserialization failures, which matters for per-item reporting in bulk
/// mode.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GradeSubmission {
    #[serde(default)]
    #[serde(alias = "studentId")]
    pub(crate) student_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "subjectId")]
    pub(crate) subject_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "taskId")]
    pub(crate) task_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "gradeValue")]
    pub(crate) grade_value: Option<f64>,
    #[serde(default)]
    #[serde(alias = "gradeType")]
    pub(crate) grade_type: Option<GradeType>,
    #[serde(default)]
    pub(crate) semester: Option<i64>,
    #[serde(default)]
    #[serde(alias = "academicYear")]
    pub(crate) academic_year: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BulkGradesRequest {
    #[serde(default)]
    pub(crate) grades: Vec<GradeSubmission>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GradeListQuery {
    #[serde(default)]
    pub(crate) semester: Option<i64>,
    #[serde(default)]
    pub(crate) academic_year: Option<String>,
    #[serde(default)]
    pub(crate) subject_id: Option<String>,
    #[serde(default)]
    pub(crate) grade_type: Option<GradeType>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReportQuery {
    #[serde(default)]
    pub(crate) semester: Option<i64>,
    #[serde(default)]
    pub(crate) academic_year: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct GradeSavedResponse {
    pub(crate) message: String,
    #[serde(rename = "gradeId")]
    pub(crate) grade_id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct BulkFailure {
    pub(crate) index: usize,
    pub(crate) error: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct BulkOkResponse {
    pub(crate) message: String,
    pub(crate) processed: usize,
}

#[derive(Debug, Serialize)]
pub(crate) struct BulkErrorResponse {
    pub(crate) error: String,
    pub(crate) details: Vec<BulkFailure>,
    pub(crate) processed: usize,
}

#[derive(Debug, Serialize)]
pub(crate) struct GradeResponse {
    pub(crate) id: String,
    pub(crate) student_id: String,
    pub(crate) student_name: String,
    pub(crate) subject_id: String,
    pub(crate) subject_name: String,
    pub(crate) task_id: Option<String>,
    pub(crate) task_name: Option<String>,
    pub(crate) grade_value: f64,
    pub(crate) grade_type: GradeType,
    pub(crate) semester: i64,
    pub(crate) academic_year: String,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl GradeResponse {
    pub(crate) fn from_row(row: GradeWithNames) -> Self {
        Self {
            id: row.id,
            student_id: row.student_id,
            student_name: row.student_name,
            subject_id: row.subject_id,
            subject_name: row.subject_name,
            task_id: row.task_id,
            task_name: row.task_name,
            grade_value: row.grade_value,
            grade_type: row.grade_type,
            semester: row.semester,
            academic_year: row.academic_year,
            created_at: format_primitive(row.created_at),
            updated_at: format_primitive(row.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentSummaryResponse {
    pub(crate) student: StudentResponse,
    pub(crate) grades: Vec<StudentGradeRow>,
}
