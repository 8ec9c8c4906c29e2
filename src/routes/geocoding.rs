use axum::{routing::get, Router};

use crate::handlers::geocoding;
use crate::state::AppState;

pub fn geocoding_routes() -> Router<AppState> {
    Router::new()
        .route("/geocode/reverse", get(geocoding::reverse))
        .route("/geocode/search", get(geocoding::search))
}
