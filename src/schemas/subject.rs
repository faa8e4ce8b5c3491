use serde::Serialize;

use crate::core::time::format_primitive;
use crate::db::models::Subject;

#[derive(Debug, Serialize)]
pub(crate) struct SubjectResponse {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) class_id: Option<i64>,
    pub(crate) is_custom: bool,
    pub(crate) created_at: String,
}

impl SubjectResponse {
    pub(crate) fn from_db(subject: Subject) -> Self {
        Self {
            id: subject.id,
            name: subject.name,
            class_id: subject.class_id,
            is_custom: subject.is_custom,
            created_at: format_primitive(subject.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CleanupResponse {
    pub(crate) message: String,
    pub(crate) removed: u64,
}
