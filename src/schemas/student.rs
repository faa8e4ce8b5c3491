use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Student;
use crate::schemas::grade::GradeResponse;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct StudentCreate {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) nis: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct StudentUpdate {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) nis: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentResponse {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) nis: Option<String>,
    pub(crate) class_id: i64,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl StudentResponse {
    pub(crate) fn from_db(student: Student) -> Self {
        Self {
            id: student.id,
            name: student.name,
            nis: student.nis,
            class_id: student.class_id,
            created_at: format_primitive(student.created_at),
            updated_at: format_primitive(student.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentCreatedResponse {
    pub(crate) message: String,
    pub(crate) student: StudentResponse,
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentDetailResponse {
    pub(crate) student: StudentResponse,
    pub(crate) grades: Vec<GradeResponse>,
}
