use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::models::User;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct RegisterRequest {
    #[validate(length(min = 3, message = "username must be at least 3 characters"))]
    pub(crate) username: String,
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    pub(crate) password: String,
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub(crate) name: String,
    #[serde(alias = "classId")]
    #[validate(range(min = 1, max = 6, message = "class_id must be between 1 and 6"))]
    pub(crate) class_id: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginRequest {
    pub(crate) username: String,
    pub(crate) password: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct UserResponse {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) name: String,
    pub(crate) class_id: i64,
}

impl UserResponse {
    pub(crate) fn from_db(user: User) -> Self {
        Self { id: user.id, username: user.username, name: user.name, class_id: user.class_id }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RegisterResponse {
    pub(crate) message: String,
    pub(crate) user: UserResponse,
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginResponse {
    pub(crate) message: String,
    pub(crate) token: String,
    pub(crate) user: UserResponse,
}

#[derive(Debug, Serialize)]
pub(crate) struct MeResponse {
    pub(crate) success: bool,
    pub(crate) user: UserResponse,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeleteAccountRequest {
    pub(crate) password: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PurgeAccountsRequest {
    #[serde(alias = "confirmationPassword")]
    pub(crate) confirmation_password: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct PurgeAccountsResponse {
    pub(crate) message: String,
    #[serde(rename = "deletedAccounts")]
    pub(crate) deleted_accounts: u64,
}

#[derive(Debug, Serialize)]
pub(crate) struct ClassResponse {
    pub(crate) id: i64,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
}
