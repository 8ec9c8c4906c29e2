//! Centralized API error handling for MontirKu
//!
//! Every domain error converts into [`ApiError`], which owns the HTTP status
//! mapping and the JSON error body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::auth::AuthError;
use crate::booking::BookingError;
use crate::chat::ChatError;
use crate::geocoding::GeocodingError;
use crate::store::StoreError;
use crate::workshop::WorkshopError;

/// API error type with HTTP status code mapping
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Illegal transition: {0}")]
    IllegalTransition(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Too many requests")]
    TooManyRequests,

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("Validation error: {message}")]
    ValidationError {
        message: String,
        details: Option<serde_json::Value>,
    },
}

/// JSON error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

/// Error details in the response
#[derive(Serialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Validation failure on a single named field
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        ApiError::ValidationError {
            details: Some(json!({ field: [message.clone()] })),
            message: format!("{}: {}", field, message),
        }
    }

    /// Get the error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::IllegalTransition(_) => "ILLEGAL_TRANSITION",
            ApiError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ApiError::TooManyRequests => "TOO_MANY_REQUESTS",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
            ApiError::ExternalServiceError(_) => "EXTERNAL_SERVICE_ERROR",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::IllegalTransition(_) => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ExternalServiceError(_) => StatusCode::BAD_GATEWAY,
            ApiError::ValidationError { .. } => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();
        let message = self.to_string();

        // Log server errors
        match &self {
            ApiError::InternalError(_)
            | ApiError::DatabaseError(_)
            | ApiError::ExternalServiceError(_) => {
                tracing::error!(error = %message, code = %error_code, "Server error occurred");
            }
            _ => {
                tracing::debug!(error = %message, code = %error_code, "Client error occurred");
            }
        }

        let details = match self {
            ApiError::ValidationError { details, .. } => details,
            _ => None,
        };

        let body = ErrorResponse {
            error: ErrorDetails {
                code: error_code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

// Conversions from domain errors

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(what) => ApiError::Conflict(what),
            StoreError::Backend(e) => ApiError::DatabaseError(e),
        }
    }
}

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::Validation { field, message } => ApiError::field(&field, message),
            BookingError::NotFound(id) => ApiError::NotFound(format!("booking {}", id)),
            BookingError::Conflict(msg) => ApiError::Conflict(msg),
            BookingError::IllegalTransition(msg) => ApiError::IllegalTransition(msg),
            BookingError::Forbidden(msg) => ApiError::Forbidden(msg),
            BookingError::Upstream(msg) => ApiError::ExternalServiceError(msg),
            BookingError::Interrupted(msg) => ApiError::InternalError(msg),
            BookingError::Store(e) => e.into(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => {
                ApiError::Unauthorized("Invalid email or password".to_string())
            }
            AuthError::EmailTaken => ApiError::Conflict("Email is already registered".to_string()),
            AuthError::Validation { field, message } => ApiError::field(&field, message),
            AuthError::AccountNotFound => ApiError::NotFound("account".to_string()),
            AuthError::Hashing(e) => ApiError::InternalError(e),
            AuthError::Token(e) => ApiError::InternalError(e.to_string()),
            AuthError::Store(e) => e.into(),
        }
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::Validation { field, message } => ApiError::field(&field, message),
            ChatError::NotFound(what) => ApiError::NotFound(what),
            ChatError::Forbidden(msg) => ApiError::Forbidden(msg),
            ChatError::Conflict(msg) => ApiError::Conflict(msg),
            ChatError::TooLarge(limit) => {
                ApiError::PayloadTooLarge(format!("attachments are limited to {} bytes", limit))
            }
            ChatError::Media(e) => ApiError::InternalError(e),
            ChatError::Store(e) => e.into(),
        }
    }
}

impl From<WorkshopError> for ApiError {
    fn from(err: WorkshopError) -> Self {
        match err {
            WorkshopError::NotFound(id) => ApiError::NotFound(format!("workshop {}", id)),
            WorkshopError::Forbidden(msg) => ApiError::Forbidden(msg),
            WorkshopError::Invalid(errors) => errors.into(),
            WorkshopError::Store(e) => e.into(),
        }
    }
}

impl From<GeocodingError> for ApiError {
    fn from(err: GeocodingError) -> Self {
        match err {
            GeocodingError::NoMatch => ApiError::NotFound("no matching location".to_string()),
            other => ApiError::ExternalServiceError(other.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        let details = serde_json::to_value(err.field_errors()).ok();
        ApiError::ValidationError {
            message: err.to_string(),
            details,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::BadRequest(format!("Invalid JSON: {}", err))
    }
}

/// Result type alias using ApiError
pub type ApiResult<T> = Result<T, ApiError>;
