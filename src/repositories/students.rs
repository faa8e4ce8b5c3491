use sqlx::SqlitePool;
use time::PrimitiveDateTime;

use crate::db::models::Student;

const COLUMNS: &str = "id, name, nis, class_id, created_at, updated_at";

pub(crate) async fn list_by_class(
    pool: &SqlitePool,
    class_id: i64,
) -> Result<Vec<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!(
        "SELECT {COLUMNS} FROM students WHERE class_id = ? ORDER BY name"
    ))
    .bind(class_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn find_in_class(
    pool: &SqlitePool,
    id: &str,
    class_id: i64,
) -> Result<Option<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!(
        "SELECT {COLUMNS} FROM students WHERE id = ? AND class_id = ?"
    ))
    .bind(id)
    .bind(class_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn name_exists_in_class(
    pool: &SqlitePool,
    name: &str,
    class_id: i64,
    exclude_id: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let found = sqlx::query_scalar::<_, String>(
        "SELECT id FROM students WHERE name = ? AND class_id = ? AND id != ?",
    )
    .bind(name)
    .bind(class_id)
    .bind(exclude_id.unwrap_or(""))
    .fetch_optional(pool)
    .await?;
    Ok(found.is_some())
}

pub(crate) async fn name_exists_in_other_class(
    pool: &SqlitePool,
    name: &str,
    class_id: i64,
    exclude_id: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let found = sqlx::query_scalar::<_, String>(
        "SELECT id FROM students WHERE name = ? AND class_id != ? AND id != ?",
    )
    .bind(name)
    .bind(class_id)
    .bind(exclude_id.unwrap_or(""))
    .fetch_optional(pool)
    .await?;
    Ok(found.is_some())
}

pub(crate) async fn nis_exists(
    pool: &SqlitePool,
    nis: &str,
    exclude_id: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let found = sqlx::query_scalar::<_, String>("SELECT id FROM students WHERE nis = ? AND id != ?")
        .bind(nis)
        .bind(exclude_id.unwrap_or(""))
        .fetch_optional(pool)
        .await?;
    Ok(found.is_some())
}

pub(crate) struct CreateStudent<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub nis: Option<&'a str>,
    pub class_id: i64,
    pub created_at: PrimitiveDateTime,
    pub updated_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &SqlitePool,
    params: CreateStudent<'_>,
) -> Result<Student, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!(
        "INSERT INTO students (id, name, nis, class_id, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.name)
    .bind(params.nis)
    .bind(params.class_id)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn update(
    pool: &SqlitePool,
    id: &str,
    name: &str,
    nis: Option<&str>,
    updated_at: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE students SET name = ?, nis = ?, updated_at = ? WHERE id = ?")
        .bind(name)
        .bind(nis)
        .bind(updated_at)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Removes the student together with every grade recorded for them.
pub(crate) async fn delete_with_grades(pool: &SqlitePool, id: &str) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM grades WHERE student_id = ?").bind(id).execute(&mut *tx).await?;
    sqlx::query("DELETE FROM students WHERE id = ?").bind(id).execute(&mut *tx).await?;

    tx.commit().await
}
