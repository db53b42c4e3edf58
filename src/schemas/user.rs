use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::types::UserRole;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct UserCreate {
    #[validate(length(min = 1, max = 255, message = "Name must not be empty"))]
    pub(crate) name: String,
    #[validate(email(message = "Invalid email address"))]
    pub(crate) email: String,
    #[validate(range(min = 13, max = 120, message = "You must be at least 13 years old"))]
    pub(crate) age: i32,
    pub(crate) password: String,
    #[serde(default)]
    #[serde(alias = "confirmPassword")]
    pub(crate) confirm_password: Option<String>,
    #[serde(default = "default_user_role")]
    pub(crate) role: UserRole,
    /// Must match `INSTRUCTOR_SIGNUP_CODE` when `role` is instructor.
    #[serde(default)]
    #[serde(alias = "instructorCode")]
    pub(crate) instructor_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserLogin {
    pub(crate) email: String,
    pub(crate) password: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct UserResponse {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) age: i32,
    pub(crate) role: UserRole,
    pub(crate) is_active: bool,
    pub(crate) created_at: String,
}

impl UserResponse {
    pub(crate) fn from_db(user: crate::db::models::User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            age: user.age,
            role: user.role,
            is_active: user.is_active,
            created_at: format_primitive(user.created_at),
        }
    }
}

fn default_user_role() -> UserRole {
    UserRole::Student
}
