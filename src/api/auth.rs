use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::{validation_error, ApiError};
use crate::api::guards::CurrentTeacher;
use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::auth::{
    ClassResponse, DeleteAccountRequest, LoginRequest, LoginResponse, MeResponse,
    PurgeAccountsRequest, PurgeAccountsResponse, RegisterRequest, RegisterResponse, UserResponse,
};
use crate::schemas::MessageResponse;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
        .route("/classes", get(classes))
        .route("/delete-account", delete(delete_account))
        .route("/delete-all-accounts", post(delete_all_accounts))
}

async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    payload.validate().map_err(|e| validation_error(&e))?;

    let existing = repositories::users::exists_by_username(state.db(), &payload.username)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check existing user"))?;

    if existing.is_some() {
        return Err(ApiError::BadRequest("Username already exists".to_string()));
    }

    let hashed_password = security::hash_password(&payload.password)
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;

    let now = primitive_now_utc();
    let user = repositories::users::create(
        state.db(),
        repositories::users::CreateUser {
            id: &Uuid::new_v4().to_string(),
            username: &payload.username,
            hashed_password,
            name: &payload.name,
            class_id: payload.class_id,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create user"))?;

    let response = RegisterResponse {
        message: "User created successfully".to_string(),
        user: UserResponse::from_db(user),
    };

    Ok((StatusCode::CREATED, Json(response)))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = repositories::users::find_by_username(state.db(), &payload.username)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))?
        .ok_or(ApiError::Unauthorized("Invalid credentials"))?;

    let verified = security::verify_password(&payload.password, &user.hashed_password)
        .map_err(|_| ApiError::Unauthorized("Invalid credentials"))?;

    if !verified {
        return Err(ApiError::Unauthorized("Invalid credentials"));
    }

    let token = security::create_access_token(&user.id, state.settings(), None)
        .map_err(|e| ApiError::internal(e, "Failed to create access token"))?;

    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        token,
        user: UserResponse::from_db(user),
    }))
}

async fn me(CurrentTeacher(user): CurrentTeacher) -> Json<MeResponse> {
    Json(MeResponse { success: true, user: UserResponse::from_db(user) })
}

/// Public: the registration form needs the class roster before login.
async fn classes(State(state): State<AppState>) -> Result<Json<Vec<ClassResponse>>, ApiError> {
    let classes = repositories::classes::list_available(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load classes"))?;

    let response = classes
        .into_iter()
        .map(|class| ClassResponse {
            id: class.id,
            name: class.name,
            description: class.description,
        })
        .collect();

    Ok(Json(response))
}

async fn delete_account(
    State(state): State<AppState>,
    CurrentTeacher(user): CurrentTeacher,
    Json(payload): Json<DeleteAccountRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if payload.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Password is required for account deletion".to_string(),
        ));
    }

    let verified = security::verify_password(&payload.password, &user.hashed_password)
        .map_err(|_| ApiError::Unauthorized("Invalid password"))?;

    if !verified {
        return Err(ApiError::Unauthorized("Invalid password"));
    }

    repositories::users::delete_account_cascade(state.db(), &user.id, user.class_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete account"))?;

    Ok(Json(MessageResponse {
        message: "Account and all associated data deleted successfully".to_string(),
    }))
}

async fn delete_all_accounts(
    State(state): State<AppState>,
    Json(payload): Json<PurgeAccountsRequest>,
) -> Result<Json<PurgeAccountsResponse>, ApiError> {
    let Some(confirmation) = payload.confirmation_password else {
        return Err(ApiError::BadRequest("Password konfirmasi diperlukan".to_string()));
    };

    if confirmation != state.settings().admin().delete_password {
        return Err(ApiError::Unauthorized("Password konfirmasi salah"));
    }

    let deleted = repositories::users::purge_all(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete accounts"))?;

    Ok(Json(PurgeAccountsResponse {
        message: "Semua akun dan data terkait berhasil dihapus".to_string(),
        deleted_accounts: deleted,
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::test_support;

    #[tokio::test]
    async fn register_then_login_and_me() {
        let ctx = test_support::setup_test_context().await;

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({
                    "username": "ibu.sari",
                    "password": "rahasia1",
                    "name": "Ibu Sari",
                    "class_id": 3
                })),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = test_support::read_json(response).await;
        assert_eq!(json["message"], "User created successfully");
        assert_eq!(json["user"]["class_id"], 3);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({"username": "ibu.sari", "password": "rahasia1"})),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let json = test_support::read_json(response).await;
        assert_eq!(json["message"], "Login successful");
        let token = json["token"].as_str().expect("token").to_string();

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(Method::GET, "/api/auth/me", Some(&token), None))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let json = test_support::read_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["user"]["username"], "ibu.sari");
    }

    #[tokio::test]
    async fn register_rejects_duplicate_username() {
        let ctx = test_support::setup_test_context().await;
        test_support::insert_teacher(ctx.state.db(), "guru", "Guru", "rahasia1", 1).await;

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({
                    "username": "guru",
                    "password": "rahasia1",
                    "name": "Guru Lain",
                    "class_id": 2
                })),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = test_support::read_json(response).await;
        assert_eq!(json["error"], "Username already exists");
    }

    #[tokio::test]
    async fn login_with_wrong_password_is_unauthorized() {
        let ctx = test_support::setup_test_context().await;
        test_support::insert_teacher(ctx.state.db(), "guru", "Guru", "rahasia1", 1).await;

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({"username": "guru", "password": "salah"})),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = test_support::read_json(response).await;
        assert_eq!(json["error"], "Invalid credentials");
    }

    #[tokio::test]
    async fn classes_lists_the_seeded_six() {
        let ctx = test_support::setup_test_context().await;

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(Method::GET, "/api/auth/classes", None, None))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = test_support::read_json(response).await;
        let classes = json.as_array().expect("array");
        assert_eq!(classes.len(), 6);
        assert_eq!(classes[0]["name"], "Kelas 1");
        assert_eq!(classes[5]["id"], 6);
    }

    #[tokio::test]
    async fn delete_account_removes_class_data() {
        let ctx = test_support::setup_test_context().await;
        let teacher =
            test_support::insert_teacher(ctx.state.db(), "guru", "Guru", "rahasia1", 2).await;
        let student = test_support::insert_student(ctx.state.db(), "Andi", None, 2).await;
        let token = test_support::bearer_token(&teacher.id, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::DELETE,
                "/api/auth/delete-account",
                Some(&token),
                Some(json!({"password": "rahasia1"})),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let remaining: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM students WHERE id = ?")
                .bind(&student.id)
                .fetch_one(ctx.state.db())
                .await
                .expect("count");
        assert_eq!(remaining, 0);

        let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(ctx.state.db())
            .await
            .expect("count");
        assert_eq!(users, 0);
    }

    #[tokio::test]
    async fn delete_account_requires_the_right_password() {
        let ctx = test_support::setup_test_context().await;
        let teacher =
            test_support::insert_teacher(ctx.state.db(), "guru", "Guru", "rahasia1", 2).await;
        let token = test_support::bearer_token(&teacher.id, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::DELETE,
                "/api/auth/delete-account",
                Some(&token),
                Some(json!({"password": "salah"})),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn delete_all_accounts_is_guarded_by_admin_password() {
        let ctx = test_support::setup_test_context().await;
        test_support::insert_teacher(ctx.state.db(), "guru", "Guru", "rahasia1", 1).await;

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/auth/delete-all-accounts",
                None,
                Some(json!({})),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/auth/delete-all-accounts",
                None,
                Some(json!({"confirmation_password": "salah"})),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/auth/delete-all-accounts",
                None,
                Some(json!({"confirmation_password": "test-admin-delete"})),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let json = test_support::read_json(response).await;
        assert_eq!(json["deletedAccounts"], 1);
    }
}
