use sqlx::SqlitePool;
use time::PrimitiveDateTime;

use crate::db::models::User;

const COLUMNS: &str = "id, username, hashed_password, name, class_id, created_at, updated_at";

pub(crate) async fn find_by_id(pool: &SqlitePool, id: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_by_username(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE username = ?"))
        .bind(username)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn exists_by_username(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT id FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await
}

pub(crate) struct CreateUser<'a> {
    pub id: &'a str,
    pub username: &'a str,
    pub hashed_password: String,
    pub name: &'a str,
    pub class_id: i64,
    pub created_at: PrimitiveDateTime,
    pub updated_at: PrimitiveDateTime,
}

pub(crate) async fn create(pool: &SqlitePool, params: CreateUser<'_>) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (id, username, hashed_password, name, class_id, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.username)
    .bind(params.hashed_password)
    .bind(params.name)
    .bind(params.class_id)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(pool)
    .await
}

/// Deletes the account together with everything its class accumulated:
/// grades of the class's students, the class's tasks and custom subjects,
/// then the students and finally the user row. The seeded class itself
/// stays, other teachers may still be assigned to it.
pub(crate) async fn delete_account_cascade(
    pool: &SqlitePool,
    user_id: &str,
    class_id: i64,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        "DELETE FROM grades
         WHERE student_id IN (SELECT id FROM students WHERE class_id = ?)",
    )
    .bind(class_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM tasks WHERE class_id = ?").bind(class_id).execute(&mut *tx).await?;

    sqlx::query("DELETE FROM subjects WHERE class_id = ? AND is_custom = 1")
        .bind(class_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM students WHERE class_id = ?")
        .bind(class_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM users WHERE id = ?").bind(user_id).execute(&mut *tx).await?;

    tx.commit().await
}

/// Wipes every account and all teacher-entered data. Seeded classes and
/// default subjects survive. Returns the number of deleted accounts.
pub(crate) async fn purge_all(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM grades").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM tasks").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM subjects WHERE is_custom = 1").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM students").execute(&mut *tx).await?;
    let deleted = sqlx::query("DELETE FROM users").execute(&mut *tx).await?.rows_affected();

    tx.commit().await?;
    Ok(deleted)
}
