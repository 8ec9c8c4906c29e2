//! Public catalog handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;

use crate::catalog::{Product, ProductQuery, Promo};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Json<Vec<Product>> {
    Json(state.catalog.list_products(&query))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> ApiResult<Json<Product>> {
    state
        .catalog
        .get_product(id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("product {}", id)))
}

pub async fn list_promos(State(state): State<AppState>) -> Json<Vec<Promo>> {
    Json(state.catalog.active_promos(Utc::now()))
}
