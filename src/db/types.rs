use serde::{Deserialize, Serialize};
use sqlx::Type;

/// Kind of a grade entry. Stored as TEXT (`task` / `final`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub(crate) enum GradeType {
    Task,
    Final,
}
