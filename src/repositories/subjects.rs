use sqlx::SqlitePool;

use crate::db::models::Subject;

const COLUMNS: &str = "id, name, class_id, is_custom, created_at";

pub(crate) async fn list_by_class(
    pool: &SqlitePool,
    class_id: i64,
) -> Result<Vec<Subject>, sqlx::Error> {
    sqlx::query_as::<_, Subject>(&format!(
        "SELECT {COLUMNS} FROM subjects WHERE class_id = ? ORDER BY name"
    ))
    .bind(class_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn find_in_class(
    pool: &SqlitePool,
    id: &str,
    class_id: i64,
) -> Result<Option<Subject>, sqlx::Error> {
    sqlx::query_as::<_, Subject>(&format!(
        "SELECT {COLUMNS} FROM subjects WHERE id = ? AND class_id = ?"
    ))
    .bind(id)
    .bind(class_id)
    .fetch_optional(pool)
    .await
}

/// Collapses subjects that share the same (name, class) pair down to the
/// oldest row. Returns the number of removed duplicates.
pub(crate) async fn cleanup_duplicates(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
    // rowid tracks insertion order; the text ids are random UUIDs.
    let result = sqlx::query(
        "DELETE FROM subjects
         WHERE rowid NOT IN (
             SELECT MIN(rowid)
             FROM subjects
             GROUP BY name, class_id
         )",
    )
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
