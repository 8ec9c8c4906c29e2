//! Identity directory for MontirKu
//!
//! - Email/password accounts hashed with bcrypt
//! - JWT token generation and validation

mod jwt;
mod password;
mod service;

use thiserror::Error;

pub use jwt::{generate_token, verify_token, Claims, JwtError};
pub use service::AuthService;

use crate::store::StoreError;

/// Auth service errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Email is already registered")]
    EmailTaken,

    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    #[error("Account not found")]
    AccountNotFound,

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Token error: {0}")]
    Token(#[from] JwtError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
