//! Workshop directory handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::AuthenticatedUser;
use crate::error::ApiResult;
use crate::state::AppState;
use crate::workshop::{ListWorkshopsQuery, Workshop, WorkshopRequest};

pub async fn list_workshops(
    State(state): State<AppState>,
    Query(query): Query<ListWorkshopsQuery>,
) -> ApiResult<Json<Vec<Workshop>>> {
    Ok(Json(state.workshop_service.list(&query).await?))
}

pub async fn get_workshop(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Workshop>> {
    Ok(Json(state.workshop_service.get(id).await?))
}

pub async fn create_workshop(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<WorkshopRequest>,
) -> ApiResult<(StatusCode, Json<Workshop>)> {
    let workshop = state.workshop_service.create(user.actor(), req).await?;
    Ok((StatusCode::CREATED, Json(workshop)))
}

pub async fn update_workshop(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(req): Json<WorkshopRequest>,
) -> ApiResult<Json<Workshop>> {
    Ok(Json(
        state.workshop_service.update(id, user.actor(), req).await?,
    ))
}

pub async fn delete_workshop(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.workshop_service.delete(id, user.actor()).await?;
    Ok(StatusCode::NO_CONTENT)
}
