use std::sync::{Arc, OnceLock};

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request},
    Router,
};
use sqlx::SqlitePool;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::api;
use crate::core::{bootstrap, config::Settings, security, state::AppState, time::primitive_now_utc};
use crate::db::models::{Student, Task, User};
use crate::db::types::GradeType;
use crate::repositories;

const TEST_SECRET_KEY: &str = "test-secret";

pub(crate) struct TestContext {
    pub(crate) state: AppState,
    pub(crate) app: Router,
    _guard: OwnedMutexGuard<()>,
}

pub(crate) async fn env_lock() -> OwnedMutexGuard<()> {
    static LOCK: OnceLock<Arc<Mutex<()>>> = OnceLock::new();
    let lock = LOCK.get_or_init(|| Arc::new(Mutex::new(()))).clone();
    lock.lock_owned().await
}

fn set_test_env(db_path: &str) {
    std::env::set_var("GRADEBOOK_ENV", "test");
    std::env::set_var("GRADEBOOK_STRICT_CONFIG", "0");
    std::env::set_var("SECRET_KEY", TEST_SECRET_KEY);
    std::env::set_var("DATABASE_URL", format!("sqlite://{db_path}"));
    std::env::set_var("ADMIN_DELETE_PASSWORD", "test-admin-delete");
    std::env::set_var("PROMETHEUS_ENABLED", "0");
}

/// Fresh context backed by a throwaway database file. A file rather than
/// `:memory:` because the pool opens several connections and each
/// in-memory connection would get its own empty database.
pub(crate) async fn setup_test_context() -> TestContext {
    let guard = env_lock().await;

    let db_path = std::env::temp_dir().join(format!("gradebook-test-{}.sqlite3", Uuid::new_v4()));
    set_test_env(&db_path.to_string_lossy());

    let settings = Settings::load().expect("settings");
    let db = crate::db::init_pool(&settings).await.expect("db pool");
    crate::db::run_migrations(&db).await.expect("migrations");

    let state = AppState::new(settings, db);
    bootstrap::seed_reference_data(&state).await.expect("seed reference data");

    let app = api::router::router(state.clone());

    TestContext { state, app, _guard: guard }
}

pub(crate) async fn insert_teacher(
    pool: &SqlitePool,
    username: &str,
    name: &str,
    password: &str,
    class_id: i64,
) -> User {
    let hashed_password = security::hash_password(password).expect("hash password");
    let now = primitive_now_utc();

    repositories::users::create(
        pool,
        repositories::users::CreateUser {
            id: &Uuid::new_v4().to_string(),
            username,
            hashed_password,
            name,
            class_id,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .expect("insert teacher")
}

pub(crate) async fn insert_student(
    pool: &SqlitePool,
    name: &str,
    nis: Option<&str>,
    class_id: i64,
) -> Student {
    let now = primitive_now_utc();

    repositories::students::create(
        pool,
        repositories::students::CreateStudent {
            id: &Uuid::new_v4().to_string(),
            name,
            nis,
            class_id,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .expect("insert student")
}

/// Id of one of the seeded default subjects for the class.
pub(crate) async fn subject_id_by_name(pool: &SqlitePool, class_id: i64, name: &str) -> String {
    sqlx::query_scalar::<_, String>("SELECT id FROM subjects WHERE class_id = ? AND name = ?")
        .bind(class_id)
        .bind(name)
        .fetch_one(pool)
        .await
        .expect("seeded subject")
}

pub(crate) async fn insert_task(
    pool: &SqlitePool,
    name: &str,
    subject_id: &str,
    class_id: i64,
) -> Task {
    let now = primitive_now_utc();

    repositories::tasks::create(
        pool,
        repositories::tasks::CreateTask {
            id: &Uuid::new_v4().to_string(),
            name,
            description: None,
            subject_id,
            class_id,
            due_date: None,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .expect("insert task")
}

pub(crate) async fn insert_grade(
    pool: &SqlitePool,
    student_id: &str,
    subject_id: &str,
    task_id: Option<&str>,
    grade_value: f64,
    grade_type: GradeType,
) -> String {
    let outcome = repositories::grades::upsert(
        pool,
        repositories::grades::UpsertGrade {
            candidate_id: &Uuid::new_v4().to_string(),
            student_id,
            subject_id,
            task_id,
            grade_value,
            grade_type,
            semester: 1,
            academic_year: "2025/2026",
            now: primitive_now_utc(),
        },
    )
    .await
    .expect("insert grade");
    outcome.grade_id
}

pub(crate) fn bearer_token(user_id: &str, settings: &Settings) -> String {
    security::create_access_token(user_id, settings, None).expect("token")
}

pub(crate) fn json_request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    if let Some(body) = body {
        let bytes = serde_json::to_vec(&body).expect("serialize body");
        builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(bytes))
            .expect("request body")
    } else {
        builder.body(Body::empty()).expect("request body")
    }
}

pub(crate) async fn read_json(response: axum::response::Response<Body>) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("response body");
    serde_json::from_slice(&body).unwrap_or_else(|err| {
        let body_text = String::from_utf8_lossy(&body);
        panic!("json parse: {err}; body: {body_text}");
    })
}
