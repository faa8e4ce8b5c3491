use sqlx::SqlitePool;

use crate::db::models::Class;

const COLUMNS: &str = "id, name, description, created_at";

pub(crate) async fn list_available(pool: &SqlitePool) -> Result<Vec<Class>, sqlx::Error> {
    sqlx::query_as::<_, Class>(&format!(
        "SELECT {COLUMNS} FROM classes WHERE id <= 6 ORDER BY id"
    ))
    .fetch_all(pool)
    .await
}

pub(crate) async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Class>, sqlx::Error> {
    sqlx::query_as::<_, Class>(&format!("SELECT {COLUMNS} FROM classes WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
}
