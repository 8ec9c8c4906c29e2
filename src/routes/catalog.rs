use axum::{routing::get, Router};

use crate::handlers::catalog::*;
use crate::state::AppState;

pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/:id", get(get_product))
        .route("/promos", get(list_promos))
}
