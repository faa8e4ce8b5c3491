use serde::Serialize;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use time::PrimitiveDateTime;

use crate::db::types::GradeType;

#[derive(Debug, Clone, Serialize, FromRow)]
pub(crate) struct GradeWithNames {
    pub(crate) id: String,
    pub(crate) student_id: String,
    pub(crate) subject_id: String,
    pub(crate) task_id: Option<String>,
    pub(crate) grade_value: f64,
    pub(crate) grade_type: GradeType,
    pub(crate) semester: i64,
    pub(crate) academic_year: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
    pub(crate) student_name: String,
    pub(crate) subject_name: String,
    pub(crate) task_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub(crate) struct StudentGradeRow {
    pub(crate) subject_name: String,
    pub(crate) semester: i64,
    pub(crate) academic_year: String,
    pub(crate) grade_value: f64,
}

/// Raw material of the grade report: one row per (student, grade) pair for
/// the class, with students that have no grades appearing once with NULL
/// grade columns.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct ReportRow {
    pub(crate) student_name: String,
    pub(crate) nis: Option<String>,
    pub(crate) subject_name: Option<String>,
    pub(crate) grade_value: Option<f64>,
    pub(crate) grade_type: Option<GradeType>,
    pub(crate) task_name: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub(crate) struct GradeFilter<'a> {
    pub semester: Option<i64>,
    pub academic_year: Option<&'a str>,
    pub subject_id: Option<&'a str>,
    pub grade_type: Option<GradeType>,
}

pub(crate) struct UpsertGrade<'a> {
    pub candidate_id: &'a str,
    pub student_id: &'a str,
    pub subject_id: &'a str,
    pub task_id: Option<&'a str>,
    pub grade_value: f64,
    pub grade_type: GradeType,
    pub semester: i64,
    pub academic_year: &'a str,
    pub now: PrimitiveDateTime,
}

pub(crate) struct UpsertOutcome {
    pub grade_id: String,
    pub inserted: bool,
}

/// Inserts the grade, or overwrites the value of the row holding the same
/// natural key. A single statement, so two identical submissions racing
/// each other converge on one row instead of erroring or duplicating.
pub(crate) async fn upsert(
    pool: &SqlitePool,
    params: UpsertGrade<'_>,
) -> Result<UpsertOutcome, sqlx::Error> {
    let grade_id = sqlx::query_scalar::<_, String>(
        "INSERT INTO grades (
            id, student_id, subject_id, task_id, grade_value, grade_type,
            semester, academic_year, created_at, updated_at
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT (student_id, subject_id, grade_type, semester, academic_year, IFNULL(task_id, ''))
         DO UPDATE SET grade_value = excluded.grade_value, updated_at = excluded.updated_at
         RETURNING id",
    )
    .bind(params.candidate_id)
    .bind(params.student_id)
    .bind(params.subject_id)
    .bind(params.task_id)
    .bind(params.grade_value)
    .bind(params.grade_type)
    .bind(params.semester)
    .bind(params.academic_year)
    .bind(params.now)
    .bind(params.now)
    .fetch_one(pool)
    .await?;

    // The conflict branch keeps the existing id, so a fresh candidate id
    // coming back means a new row was created.
    let inserted = grade_id == params.candidate_id;
    Ok(UpsertOutcome { grade_id, inserted })
}

pub(crate) async fn list_for_class(
    pool: &SqlitePool,
    class_id: i64,
    filter: GradeFilter<'_>,
) -> Result<Vec<GradeWithNames>, sqlx::Error> {
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT g.id, g.student_id, g.subject_id, g.task_id, g.grade_value, g.grade_type, \
                g.semester, g.academic_year, g.created_at, g.updated_at, \
                s.name AS student_name, sub.name AS subject_name, t.name AS task_name \
         FROM grades g \
         JOIN students s ON g.student_id = s.id \
         JOIN subjects sub ON g.subject_id = sub.id \
         LEFT JOIN tasks t ON g.task_id = t.id \
         WHERE s.class_id = ",
    );
    builder.push_bind(class_id);

    if let Some(semester) = filter.semester {
        builder.push(" AND g.semester = ");
        builder.push_bind(semester);
    }
    if let Some(academic_year) = filter.academic_year {
        builder.push(" AND g.academic_year = ");
        builder.push_bind(academic_year);
    }
    if let Some(subject_id) = filter.subject_id {
        builder.push(" AND g.subject_id = ");
        builder.push_bind(subject_id);
    }
    if let Some(grade_type) = filter.grade_type {
        builder.push(" AND g.grade_type = ");
        builder.push_bind(grade_type);
    }

    builder.push(" ORDER BY s.name, sub.name, g.created_at DESC");

    builder.build_query_as::<GradeWithNames>().fetch_all(pool).await
}

/// Deletes the grade only when it belongs to a student of the given class.
/// Returns whether a row was removed.
pub(crate) async fn delete_scoped(
    pool: &SqlitePool,
    grade_id: &str,
    class_id: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "DELETE FROM grades
         WHERE id = ?
           AND student_id IN (SELECT id FROM students WHERE class_id = ?)",
    )
    .bind(grade_id)
    .bind(class_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn list_for_student(
    pool: &SqlitePool,
    student_id: &str,
) -> Result<Vec<StudentGradeRow>, sqlx::Error> {
    sqlx::query_as::<_, StudentGradeRow>(
        "SELECT sub.name AS subject_name, g.semester, g.academic_year, g.grade_value
         FROM grades g
         JOIN subjects sub ON g.subject_id = sub.id
         WHERE g.student_id = ?
         ORDER BY sub.name, g.academic_year, g.semester",
    )
    .bind(student_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_for_student_detailed(
    pool: &SqlitePool,
    student_id: &str,
) -> Result<Vec<GradeWithNames>, sqlx::Error> {
    sqlx::query_as::<_, GradeWithNames>(
        "SELECT g.id, g.student_id, g.subject_id, g.task_id, g.grade_value, g.grade_type, \
                g.semester, g.academic_year, g.created_at, g.updated_at, \
                s.name AS student_name, sub.name AS subject_name, t.name AS task_name \
         FROM grades g \
         JOIN students s ON g.student_id = s.id \
         JOIN subjects sub ON g.subject_id = sub.id \
         LEFT JOIN tasks t ON g.task_id = t.id \
         WHERE g.student_id = ? \
         ORDER BY sub.name, g.semester",
    )
    .bind(student_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn report_rows(
    pool: &SqlitePool,
    class_id: i64,
    semester: Option<i64>,
    academic_year: Option<&str>,
) -> Result<Vec<ReportRow>, sqlx::Error> {
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT s.name AS student_name, s.nis, sub.name AS subject_name, \
                g.grade_value, g.grade_type, t.name AS task_name \
         FROM students s \
         LEFT JOIN grades g ON s.id = g.student_id \
         LEFT JOIN subjects sub ON g.subject_id = sub.id \
         LEFT JOIN tasks t ON g.task_id = t.id \
         WHERE s.class_id = ",
    );
    builder.push_bind(class_id);

    if let Some(semester) = semester {
        builder.push(" AND (g.semester = ");
        builder.push_bind(semester);
        builder.push(" OR g.semester IS NULL)");
    }
    if let Some(academic_year) = academic_year {
        builder.push(" AND (g.academic_year = ");
        builder.push_bind(academic_year);
        builder.push(" OR g.academic_year IS NULL)");
    }

    builder.push(" ORDER BY s.name, sub.name, g.grade_type DESC");

    builder.build_query_as::<ReportRow>().fetch_all(pool).await
}
