//! Turns raw grade submissions into rows, enforcing class ownership and
//! the one-row-per-natural-key rule.

use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::core::time::primitive_now_utc;
use crate::db::types::GradeType;
use crate::repositories::{grades, students, subjects, tasks};
use crate::schemas::grade::GradeSubmission;

#[derive(Debug, Error)]
pub(crate) enum ReconcileError {
    #[error("required fields: student_id, subject_id, grade_value, semester, academic_year")]
    MissingFields,
    #[error("grade must be between 0 and 100")]
    OutOfRange,
    #[error("student not found or access denied")]
    StudentNotFound,
    #[error("subject not found or access denied")]
    SubjectNotFound,
    #[error("task not found or access denied")]
    TaskMismatch,
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

impl ReconcileError {
    /// Client-facing message used for per-item failures in bulk mode.
    pub(crate) fn bulk_message(&self) -> &'static str {
        match self {
            ReconcileError::MissingFields => "Data tidak lengkap",
            ReconcileError::OutOfRange => "Nilai harus antara 0-100",
            ReconcileError::StudentNotFound => "Siswa tidak ditemukan dalam kelas Anda",
            ReconcileError::SubjectNotFound => "Mata pelajaran tidak ditemukan dalam kelas Anda",
            ReconcileError::TaskMismatch => "Tugas tidak ditemukan dalam kelas Anda",
            ReconcileError::Db(_) => "Gagal menyimpan nilai",
        }
    }
}

pub(crate) struct ReconcileOutcome {
    pub(crate) grade_id: String,
    pub(crate) inserted: bool,
}

pub(crate) struct BulkOutcome {
    pub(crate) processed: usize,
    /// (1-based item index, client-facing message) per failed item.
    pub(crate) failures: Vec<(usize, String)>,
}

/// Validates one submission against the teacher's class and writes it.
/// Checks run in a fixed order so the reported error is deterministic:
/// completeness, range, student, subject, task.
pub(crate) async fn reconcile_submission(
    pool: &SqlitePool,
    class_id: i64,
    submission: &GradeSubmission,
) -> Result<ReconcileOutcome, ReconcileError> {
    let (student_id, subject_id, grade_value, semester, academic_year) = match (
        submission.student_id.as_deref(),
        submission.subject_id.as_deref(),
        submission.grade_value,
        submission.semester,
        submission.academic_year.as_deref(),
    ) {
        // Semester 0 counts as missing, like the empty strings.
        (Some(st), Some(su), Some(value), Some(sem), Some(year))
            if !st.is_empty() && !su.is_empty() && !year.is_empty() && sem >= 1 =>
        {
            (st, su, value, sem, year)
        }
        _ => return Err(ReconcileError::MissingFields),
    };

    if !grade_value.is_finite() || !(0.0..=100.0).contains(&grade_value) {
        return Err(ReconcileError::OutOfRange);
    }

    if students::find_in_class(pool, student_id, class_id).await?.is_none() {
        return Err(ReconcileError::StudentNotFound);
    }

    if subjects::find_in_class(pool, subject_id, class_id).await?.is_none() {
        return Err(ReconcileError::SubjectNotFound);
    }

    let task_id = submission.task_id.as_deref().filter(|id| !id.is_empty());
    if let Some(task_id) = task_id {
        if tasks::find_for_subject(pool, task_id, class_id, subject_id).await?.is_none() {
            return Err(ReconcileError::TaskMismatch);
        }
    }

    let grade_type = submission.grade_type.unwrap_or(if task_id.is_some() {
        GradeType::Task
    } else {
        GradeType::Final
    });

    let candidate_id = Uuid::new_v4().to_string();
    let outcome = grades::upsert(
        pool,
        grades::UpsertGrade {
            candidate_id: &candidate_id,
            student_id,
            subject_id,
            task_id,
            grade_value,
            grade_type,
            semester,
            academic_year,
            now: primitive_now_utc(),
        },
    )
    .await?;

    Ok(ReconcileOutcome { grade_id: outcome.grade_id, inserted: outcome.inserted })
}

/// Processes items one at a time; a failing item never blocks the rest.
/// Failure indices are 1-based, matching what clients display.
pub(crate) async fn reconcile_bulk(
    pool: &SqlitePool,
    class_id: i64,
    items: &[GradeSubmission],
) -> BulkOutcome {
    let mut processed = 0;
    let mut failures = Vec::new();

    for (position, item) in items.iter().enumerate() {
        match reconcile_submission(pool, class_id, item).await {
            Ok(_) => processed += 1,
            Err(err) => {
                if let ReconcileError::Db(db_err) = &err {
                    tracing::error!(error = %db_err, index = position + 1, "Bulk grade item failed");
                }
                failures.push((position + 1, err.bulk_message().to_string()));
            }
        }
    }

    BulkOutcome { processed, failures }
}
