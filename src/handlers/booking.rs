//! Booking HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::AuthenticatedUser;
use crate::booking::{Booking, BookingPatch, CreateBookingRequest, ListBookingsQuery};
use crate::error::ApiResult;
use crate::state::AppState;

/// GET /bookings - Bookings visible to the caller
pub async fn list_bookings(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<ListBookingsQuery>,
) -> ApiResult<Json<Vec<Booking>>> {
    let bookings = state.booking_service.list(user.actor(), &query).await?;
    Ok(Json(bookings))
}

/// GET /bookings/:id
pub async fn get_booking(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Booking>> {
    Ok(Json(state.booking_service.get(id, user.actor()).await?))
}

/// POST /bookings - Open a booking as a customer
pub async fn create_booking(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<CreateBookingRequest>,
) -> ApiResult<(StatusCode, Json<Booking>)> {
    let booking = state.booking_service.create(user.actor(), req).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

/// PATCH /bookings/:id - Apply one lifecycle action
pub async fn update_booking(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(patch): Json<BookingPatch>,
) -> ApiResult<Json<Booking>> {
    let actor = user.actor();
    let service = &state.booking_service;

    let booking = match patch {
        BookingPatch::Claim => service.claim(id, actor).await?,
        BookingPatch::Estimate { price } => service.set_estimate(id, actor, price).await?,
        BookingPatch::Advance { status } => service.advance(id, actor, status).await?,
        BookingPatch::Cancel { reason } => service.cancel(id, actor, reason).await?,
        BookingPatch::Review { rating, comment } => {
            service.attach_review(id, actor, rating, comment).await?
        }
    };

    Ok(Json(booking))
}

/// POST /bookings/:id/pay - Mock payment
pub async fn pay_booking(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Booking>> {
    Ok(Json(state.booking_service.pay(id, user.actor()).await?))
}
