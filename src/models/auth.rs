//! Authentication request/response DTOs

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{AccountResponse, Role};

/// Request body for account signup
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 1, max = 120, message = "name is required"))]
    pub name: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 6, max = 20, message = "must be 6-20 characters"))]
    pub phone: Option<String>,
    #[validate(length(min = 8, message = "must be at least 8 characters"))]
    pub password: String,
    #[serde(default = "default_signup_role")]
    pub role: Role,
}

fn default_signup_role() -> Role {
    Role::Customer
}

/// Request body for login
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

/// Request body for updating contact details or the password
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 120, message = "name must not be empty"))]
    pub name: Option<String>,
    #[validate(email(message = "must be a valid email address"))]
    pub email: Option<String>,
    #[validate(length(min = 6, max = 20, message = "must be 6-20 characters"))]
    pub phone: Option<String>,
    #[validate(length(min = 8, message = "must be at least 8 characters"))]
    pub password: Option<String>,
}

/// Signup/login response
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: AccountResponse,
    pub token: String,
}
