//! Booking route definitions

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::booking::*;
use crate::state::AppState;

pub fn booking_routes() -> Router<AppState> {
    Router::new()
        .route("/bookings", get(list_bookings).post(create_booking))
        .route("/bookings/:id", get(get_booking).patch(update_booking))
        .route("/bookings/:id/pay", post(pay_booking))
}
