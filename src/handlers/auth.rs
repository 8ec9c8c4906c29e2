//! Authentication HTTP handlers

use axum::{extract::State, http::StatusCode, Json};

use super::AuthenticatedUser;
use crate::error::ApiResult;
use crate::models::{AccountResponse, AuthResponse, LoginRequest, SignupRequest, UpdateProfileRequest};
use crate::state::AppState;

/// POST /auth/signup - Register a customer or mechanic
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let session = state.auth_service.signup(req).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// POST /auth/login - Exchange credentials for a token
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    Ok(Json(state.auth_service.login(req).await?))
}

/// GET /auth/me - Current account
pub async fn get_current_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<AccountResponse>> {
    Ok(Json(state.auth_service.me(user.account_id).await?))
}

/// PATCH /auth/me - Update name, phone, email or password
pub async fn update_current_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<AccountResponse>> {
    let account = state
        .auth_service
        .update_profile(user.account_id, req)
        .await?;
    Ok(Json(account))
}
