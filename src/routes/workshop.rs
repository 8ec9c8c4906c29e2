//! Workshop directory routes

use axum::{routing::get, Router};

use crate::handlers::workshop::*;
use crate::state::AppState;

pub fn workshop_routes() -> Router<AppState> {
    Router::new()
        .route("/workshops", get(list_workshops).post(create_workshop))
        .route(
            "/workshops/:id",
            get(get_workshop)
                .put(update_workshop)
                .delete(delete_workshop),
        )
}
