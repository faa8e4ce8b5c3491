use serde::Serialize;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use time::PrimitiveDateTime;

use crate::db::models::Task;

const COLUMNS: &str = "id, name, description, subject_id, class_id, due_date, created_at, updated_at";

const JOINED_COLUMNS: &str = "\
    t.id, t.name, t.description, t.subject_id, t.class_id, t.due_date, \
    t.created_at, t.updated_at, s.name AS subject_name";

#[derive(Debug, Clone, Serialize, FromRow)]
pub(crate) struct TaskWithSubject {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) subject_id: String,
    pub(crate) class_id: i64,
    pub(crate) due_date: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
    pub(crate) subject_name: String,
}

/// One row of the per-task roster: every student in the class with their
/// grade for the task, when one exists.
#[derive(Debug, Clone, Serialize, FromRow)]
pub(crate) struct TaskRosterRow {
    pub(crate) student_id: String,
    pub(crate) student_name: String,
    pub(crate) nis: Option<String>,
    pub(crate) grade_id: Option<String>,
    pub(crate) grade_value: Option<f64>,
    pub(crate) semester: Option<i64>,
    pub(crate) academic_year: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct SubjectTaskRow {
    pub(crate) subject_id: String,
    pub(crate) subject_name: String,
    pub(crate) task_id: Option<String>,
    pub(crate) task_name: Option<String>,
    pub(crate) task_description: Option<String>,
    pub(crate) due_date: Option<String>,
}

pub(crate) async fn list_by_class(
    pool: &SqlitePool,
    class_id: i64,
    subject_id: Option<&str>,
) -> Result<Vec<TaskWithSubject>, sqlx::Error> {
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
        "SELECT {JOINED_COLUMNS} FROM tasks t JOIN subjects s ON t.subject_id = s.id \
         WHERE t.class_id = "
    ));
    builder.push_bind(class_id);

    if let Some(subject_id) = subject_id {
        builder.push(" AND t.subject_id = ");
        builder.push_bind(subject_id);
    }

    builder.push(" ORDER BY t.created_at DESC");

    builder.build_query_as::<TaskWithSubject>().fetch_all(pool).await
}

pub(crate) async fn find_in_class(
    pool: &SqlitePool,
    id: &str,
    class_id: i64,
) -> Result<Option<Task>, sqlx::Error> {
    sqlx::query_as::<_, Task>(&format!(
        "SELECT {COLUMNS} FROM tasks WHERE id = ? AND class_id = ?"
    ))
    .bind(id)
    .bind(class_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn find_with_subject(
    pool: &SqlitePool,
    id: &str,
    class_id: i64,
) -> Result<Option<TaskWithSubject>, sqlx::Error> {
    sqlx::query_as::<_, TaskWithSubject>(&format!(
        "SELECT {JOINED_COLUMNS} FROM tasks t JOIN subjects s ON t.subject_id = s.id \
         WHERE t.id = ? AND t.class_id = ?"
    ))
    .bind(id)
    .bind(class_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn find_for_subject(
    pool: &SqlitePool,
    id: &str,
    class_id: i64,
    subject_id: &str,
) -> Result<Option<Task>, sqlx::Error> {
    sqlx::query_as::<_, Task>(&format!(
        "SELECT {COLUMNS} FROM tasks WHERE id = ? AND class_id = ? AND subject_id = ?"
    ))
    .bind(id)
    .bind(class_id)
    .bind(subject_id)
    .fetch_optional(pool)
    .await
}

pub(crate) struct CreateTask<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub subject_id: &'a str,
    pub class_id: i64,
    pub due_date: Option<&'a str>,
    pub created_at: PrimitiveDateTime,
    pub updated_at: PrimitiveDateTime,
}

pub(crate) async fn create(pool: &SqlitePool, params: CreateTask<'_>) -> Result<Task, sqlx::Error> {
    sqlx::query_as::<_, Task>(&format!(
        "INSERT INTO tasks (id, name, description, subject_id, class_id, due_date, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.name)
    .bind(params.description)
    .bind(params.subject_id)
    .bind(params.class_id)
    .bind(params.due_date)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn update(
    pool: &SqlitePool,
    id: &str,
    name: &str,
    description: Option<&str>,
    due_date: Option<&str>,
    updated_at: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE tasks SET name = ?, description = ?, due_date = ?, updated_at = ? WHERE id = ?")
        .bind(name)
        .bind(description)
        .bind(due_date)
        .bind(updated_at)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Removes the task together with every grade recorded against it.
pub(crate) async fn delete_with_grades(pool: &SqlitePool, id: &str) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM grades WHERE task_id = ?").bind(id).execute(&mut *tx).await?;
    sqlx::query("DELETE FROM tasks WHERE id = ?").bind(id).execute(&mut *tx).await?;

    tx.commit().await
}

pub(crate) async fn list_for_subject(
    pool: &SqlitePool,
    subject_id: &str,
    class_id: i64,
) -> Result<Vec<Task>, sqlx::Error> {
    sqlx::query_as::<_, Task>(&format!(
        "SELECT {COLUMNS} FROM tasks WHERE subject_id = ? AND class_id = ? ORDER BY name"
    ))
    .bind(subject_id)
    .bind(class_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn roster_with_grades(
    pool: &SqlitePool,
    task_id: &str,
    class_id: i64,
) -> Result<Vec<TaskRosterRow>, sqlx::Error> {
    sqlx::query_as::<_, TaskRosterRow>(
        "SELECT
            st.id AS student_id,
            st.name AS student_name,
            st.nis,
            g.id AS grade_id,
            g.grade_value,
            g.semester,
            g.academic_year
         FROM students st
         LEFT JOIN grades g ON st.id = g.student_id AND g.task_id = ?
         WHERE st.class_id = ?
         ORDER BY st.name",
    )
    .bind(task_id)
    .bind(class_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_grouped_by_subject(
    pool: &SqlitePool,
    class_id: i64,
) -> Result<Vec<SubjectTaskRow>, sqlx::Error> {
    sqlx::query_as::<_, SubjectTaskRow>(
        "SELECT
            s.id AS subject_id,
            s.name AS subject_name,
            t.id AS task_id,
            t.name AS task_name,
            t.description AS task_description,
            t.due_date
         FROM subjects s
         LEFT JOIN tasks t ON s.id = t.subject_id AND t.class_id = ?
         WHERE s.class_id = ?
         ORDER BY s.name, t.created_at DESC",
    )
    .bind(class_id)
    .bind(class_id)
    .fetch_all(pool)
    .await
}
