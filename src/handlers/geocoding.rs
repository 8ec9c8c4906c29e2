//! Geocoding proxy handlers

use axum::{
    extract::{Query, State},
    Json,
};

use super::AuthenticatedUser;
use crate::error::{ApiError, ApiResult};
use crate::geocoding::{Place, ReverseQuery, SearchQuery};
use crate::state::AppState;

/// GET /geocode/reverse?lat=&lon=
pub async fn reverse(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(query): Query<ReverseQuery>,
) -> ApiResult<Json<Place>> {
    if !(-90.0..=90.0).contains(&query.lat) {
        return Err(ApiError::field("lat", "must be between -90 and 90"));
    }
    if !(-180.0..=180.0).contains(&query.lon) {
        return Err(ApiError::field("lon", "must be between -180 and 180"));
    }
    Ok(Json(state.geocoding.reverse(query.lat, query.lon).await?))
}

/// GET /geocode/search?q=
pub async fn search(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<Place>>> {
    let q = query.q.trim();
    if q.is_empty() {
        return Err(ApiError::field("q", "is required"));
    }
    Ok(Json(state.geocoding.search(q).await?))
}
