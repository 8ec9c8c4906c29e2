//! Bearer-token extraction
//!
//! A missing `Authorization` header is a 401; a token that fails verification
//! (bad signature, expired, unknown role) is a 403.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{AuthService, JwtError};
use crate::error::ApiError;
use crate::models::{Actor, Role};

/// Caller identity taken from a verified bearer token
///
/// ```rust,ignore
/// async fn protected_handler(user: AuthenticatedUser) -> impl IntoResponse {
///     format!("Hello, {}", user.account_id)
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
    pub account_id: Uuid,
    pub role: Role,
}

impl AuthenticatedUser {
    pub fn actor(&self) -> Actor {
        Actor::new(self.account_id, self.role)
    }
}

/// Verify a raw token against the auth service
pub fn authenticate_token(
    auth_service: &AuthService,
    token: &str,
) -> Result<AuthenticatedUser, ApiError> {
    let actor = auth_service.verify_token(token).map_err(|e| {
        let message = match e {
            JwtError::TokenExpired => "Token has expired".to_string(),
            other => format!("Invalid token: {}", other),
        };
        ApiError::Forbidden(message)
    })?;
    Ok(AuthenticatedUser {
        account_id: actor.id,
        role: actor.role,
    })
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    ApiError::Unauthorized(
                        "Authorization header with Bearer token required".to_string(),
                    )
                })?;

        let auth_service = Arc::<AuthService>::from_ref(state);
        authenticate_token(&auth_service, bearer.token())
    }
}
