//! Booking service layer - lifecycle rules and event emission
//!
//! Every mutation reads the record, validates it against the status graph,
//! and writes it back with a compare-and-swap on `version`. A notification is
//! published only after the swap succeeds.
//!
//! Mutations run on their own task, so a caller that stops waiting (a
//! request timeout or a dropped connection) cannot cut a mutation off
//! between the write and its notification.

use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use uuid::Uuid;

use super::lifecycle::{self, EdgeOwner};
use super::pricing::{needs_estimate, PricingPolicy};
use super::{
    Booking, BookingError, BookingFilter, BookingStatus, CreateBookingRequest, ListBookingsQuery,
    PaymentStatus, Review,
};
use crate::models::{Actor, Role};
use crate::payment::PaymentGateway;
use crate::store::BookingStore;
use crate::websocket::{Audience, Event, EventSink, Notification};

type Result<T> = std::result::Result<T, BookingError>;

/// Booking lifecycle engine
#[derive(Clone)]
pub struct BookingService {
    bookings: Arc<dyn BookingStore>,
    events: Arc<dyn EventSink>,
    pricing: Arc<dyn PricingPolicy>,
    payments: Arc<dyn PaymentGateway>,
}

impl BookingService {
    pub fn new(
        bookings: Arc<dyn BookingStore>,
        events: Arc<dyn EventSink>,
        pricing: Box<dyn PricingPolicy>,
        payments: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            bookings,
            events,
            pricing: Arc::from(pricing),
            payments,
        }
    }

    /// Open a new pending booking and announce it to mechanics
    pub async fn create(&self, actor: Actor, request: CreateBookingRequest) -> Result<Booking> {
        self.detached(move |svc| async move { svc.apply_create(actor, request).await })
            .await
    }

    /// Assign the calling mechanic to a pending booking
    pub async fn claim(&self, id: Uuid, actor: Actor) -> Result<Booking> {
        self.detached(move |svc| async move { svc.apply_claim(id, actor).await })
            .await
    }

    /// Set or revise the estimate of a routine booking
    pub async fn set_estimate(&self, id: Uuid, actor: Actor, price: i64) -> Result<Booking> {
        self.detached(move |svc| async move { svc.apply_estimate(id, actor, price).await })
            .await
    }

    /// Move a booking along one forward edge of the status graph
    pub async fn advance(&self, id: Uuid, actor: Actor, target: BookingStatus) -> Result<Booking> {
        self.detached(move |svc| async move { svc.apply_advance(id, actor, target).await })
            .await
    }

    /// Cancel a booking. Cancelling twice returns the booking unchanged.
    pub async fn cancel(&self, id: Uuid, actor: Actor, reason: Option<String>) -> Result<Booking> {
        self.detached(move |svc| async move { svc.apply_cancel(id, actor, reason).await })
            .await
    }

    pub async fn attach_review(
        &self,
        id: Uuid,
        actor: Actor,
        rating: u8,
        comment: Option<String>,
    ) -> Result<Booking> {
        self.detached(move |svc| async move {
            svc.apply_review(id, actor, rating, comment).await
        })
        .await
    }

    /// Charge the booking's price through the gateway and mark it paid.
    ///
    /// The charge happens before the write; a failed charge changes nothing.
    pub async fn pay(&self, id: Uuid, actor: Actor) -> Result<Booking> {
        self.detached(move |svc| async move { svc.apply_payment(id, actor).await })
            .await
    }

    async fn apply_create(&self, actor: Actor, request: CreateBookingRequest) -> Result<Booking> {
        if actor.role != Role::Customer {
            return Err(BookingError::Forbidden(
                "Only customers can create bookings".to_string(),
            ));
        }

        let location = request
            .location
            .ok_or_else(|| BookingError::validation("location", "is required"))?;
        if !location.in_range() {
            return Err(BookingError::validation(
                "location",
                "coordinates are out of range",
            ));
        }
        let scheduled_at = request
            .scheduled_at
            .ok_or_else(|| BookingError::validation("scheduled_at", "is required"))?;

        let booking = Booking {
            id: Uuid::new_v4(),
            customer_id: actor.id,
            montir_id: None,
            service_category: request.service_category,
            service_type: request.service_type,
            vehicle: request.vehicle,
            location,
            description: request.description.filter(|d| !d.trim().is_empty()),
            scheduled_at,
            status: BookingStatus::Pending,
            price: 0,
            payment_status: PaymentStatus::Unpaid,
            payment_reference: None,
            cancel_reason: None,
            review: None,
            created_at: Utc::now(),
            updated_at: None,
            version: 0,
        };

        self.bookings.insert(&booking).await?;
        tracing::info!(booking = %booking.id, customer = %actor.id, "Booking created");

        self.notify(Audience::Role(Role::Mechanic), Event::NewBooking(booking.clone()))
            .await;
        Ok(booking)
    }

    async fn apply_claim(&self, id: Uuid, actor: Actor) -> Result<Booking> {
        if actor.role != Role::Mechanic {
            return Err(BookingError::Forbidden(
                "Only mechanics can claim bookings".to_string(),
            ));
        }

        let current = self.load(id).await?;
        if current.status != BookingStatus::Pending || current.montir_id.is_some() {
            return Err(BookingError::Conflict(format!(
                "Booking {} is no longer available",
                id
            )));
        }

        let mut next = current.clone();
        next.montir_id = Some(actor.id);
        next.status = lifecycle::claim_target(current.service_type);
        if !needs_estimate(&current) {
            next.price = self.pricing.price_on_claim(&current);
        }

        let booking = self.commit(&current, next).await?;
        tracing::info!(booking = %id, mechanic = %actor.id, status = %booking.status, "Booking claimed");

        self.notify_counterparty(&booking, actor).await;
        Ok(booking)
    }

    async fn apply_estimate(&self, id: Uuid, actor: Actor, price: i64) -> Result<Booking> {
        let current = self.load(id).await?;
        if current.status != BookingStatus::WaitingApproval {
            return Err(BookingError::IllegalTransition(format!(
                "Cannot set an estimate while the booking is {}",
                current.status
            )));
        }
        if current.montir_id != Some(actor.id) {
            return Err(BookingError::Forbidden(
                "Only the assigned mechanic can set the estimate".to_string(),
            ));
        }
        if price <= 0 {
            return Err(BookingError::validation("price", "must be greater than zero"));
        }

        let mut next = current.clone();
        next.price = price;

        let booking = self.commit(&current, next).await?;
        self.notify_counterparty(&booking, actor).await;
        Ok(booking)
    }

    async fn apply_advance(&self, id: Uuid, actor: Actor, target: BookingStatus) -> Result<Booking> {
        if target == BookingStatus::Cancelled {
            return self.apply_cancel(id, actor, None).await;
        }

        let current = self.load(id).await?;
        let owner = lifecycle::advance_owner(current.status, target).ok_or_else(|| {
            BookingError::IllegalTransition(format!(
                "Cannot move a booking from {} to {}",
                current.status, target
            ))
        })?;

        let authorized = match owner {
            EdgeOwner::Customer => current.customer_id == actor.id,
            EdgeOwner::Mechanic => current.montir_id == Some(actor.id),
        };
        if !authorized {
            return Err(BookingError::IllegalTransition(format!(
                "Caller may not move this booking from {} to {}",
                current.status, target
            )));
        }

        if target == BookingStatus::Approved && current.price <= 0 {
            return Err(BookingError::IllegalTransition(
                "Cannot approve a booking without an estimate".to_string(),
            ));
        }

        let mut next = current.clone();
        next.status = target;

        let booking = self.commit(&current, next).await?;
        tracing::info!(booking = %id, from = %current.status, to = %target, "Booking advanced");

        self.notify_counterparty(&booking, actor).await;
        Ok(booking)
    }

    async fn apply_cancel(&self, id: Uuid, actor: Actor, reason: Option<String>) -> Result<Booking> {
        let current = self.load(id).await?;

        let allowed = current.customer_id == actor.id
            || current.montir_id == Some(actor.id)
            || actor.is_admin()
            || (actor.role == Role::Mechanic && current.montir_id.is_none());
        if !allowed {
            return Err(BookingError::Forbidden(
                "Not allowed to cancel this booking".to_string(),
            ));
        }

        if current.status == BookingStatus::Cancelled {
            return Ok(current);
        }
        if !lifecycle::can_cancel(current.status) {
            return Err(BookingError::IllegalTransition(format!(
                "Cannot cancel a booking that is {}",
                current.status
            )));
        }

        let mut next = current.clone();
        next.status = BookingStatus::Cancelled;
        next.cancel_reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());

        let booking = self.commit(&current, next).await?;
        tracing::info!(booking = %id, by = %actor.id, "Booking cancelled");

        self.notify_counterparty(&booking, actor).await;
        Ok(booking)
    }

    async fn apply_review(
        &self,
        id: Uuid,
        actor: Actor,
        rating: u8,
        comment: Option<String>,
    ) -> Result<Booking> {
        if !(1..=5).contains(&rating) {
            return Err(BookingError::validation("rating", "must be between 1 and 5"));
        }

        let current = self.load(id).await?;
        if current.customer_id != actor.id {
            return Err(BookingError::Forbidden(
                "Only the customer can review a booking".to_string(),
            ));
        }
        if current.status != BookingStatus::Completed {
            return Err(BookingError::IllegalTransition(
                "Only completed bookings can be reviewed".to_string(),
            ));
        }
        if current.review.is_some() {
            return Err(BookingError::Conflict(
                "Booking has already been reviewed".to_string(),
            ));
        }

        let mut next = current.clone();
        next.review = Some(Review {
            rating,
            comment: comment.filter(|c| !c.trim().is_empty()),
            created_at: Utc::now(),
        });

        let booking = self.commit(&current, next).await?;
        self.notify_counterparty(&booking, actor).await;
        Ok(booking)
    }

    async fn apply_payment(&self, id: Uuid, actor: Actor) -> Result<Booking> {
        let current = self.load(id).await?;
        if current.customer_id != actor.id {
            return Err(BookingError::Forbidden(
                "Only the customer can pay for a booking".to_string(),
            ));
        }
        if current.status == BookingStatus::Cancelled {
            return Err(BookingError::IllegalTransition(
                "Cancelled bookings cannot be paid".to_string(),
            ));
        }
        if current.payment_status == PaymentStatus::Paid {
            return Err(BookingError::Conflict("Booking is already paid".to_string()));
        }
        if current.price <= 0 {
            return Err(BookingError::Conflict(
                "Booking has not been priced yet".to_string(),
            ));
        }

        let receipt = self.payments.charge(id, current.price).await?;

        let mut next = current.clone();
        next.payment_status = PaymentStatus::Paid;
        next.payment_reference = Some(receipt.reference);

        let booking = self.commit(&current, next).await?;
        tracing::info!(booking = %id, amount = booking.price, "Booking paid");

        self.notify(
            Audience::User(booking.customer_id),
            Event::TransactionSuccess(booking.clone()),
        )
        .await;
        Ok(booking)
    }

    pub async fn get(&self, id: Uuid, actor: Actor) -> Result<Booking> {
        let booking = self.load(id).await?;
        let visible = booking.is_participant(actor.id)
            || actor.is_admin()
            || (actor.role == Role::Mechanic && booking.is_unclaimed());
        if !visible {
            return Err(BookingError::Forbidden(
                "Not allowed to view this booking".to_string(),
            ));
        }
        Ok(booking)
    }

    /// List bookings visible to the caller, newest first
    pub async fn list(&self, actor: Actor, query: &ListBookingsQuery) -> Result<Vec<Booking>> {
        let (limit, offset) = query.pagination().limit_offset();
        let mut filter = BookingFilter {
            status: query.status,
            limit,
            offset,
            ..BookingFilter::default()
        };

        match actor.role {
            Role::Admin => filter.participant = query.user_id,
            Role::Customer => {
                if query.user_id.is_some_and(|u| u != actor.id) {
                    return Err(BookingError::Forbidden(
                        "Customers can only list their own bookings".to_string(),
                    ));
                }
                filter.participant = Some(actor.id);
            }
            Role::Mechanic => match query.user_id {
                Some(user_id) if user_id == actor.id => filter.participant = Some(actor.id),
                Some(_) => {
                    return Err(BookingError::Forbidden(
                        "Mechanics can only list their own bookings".to_string(),
                    ))
                }
                None => {
                    filter.unassigned = true;
                    filter.status = Some(query.status.unwrap_or(BookingStatus::Pending));
                }
            },
        }

        Ok(self.bookings.list(&filter).await?)
    }

    /// Run `op` on a spawned task and wait for it
    async fn detached<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: FnOnce(BookingService) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        tokio::spawn(op(self.clone()))
            .await
            .map_err(|e| BookingError::Interrupted(e.to_string()))?
    }

    async fn load(&self, id: Uuid) -> Result<Booking> {
        self.bookings
            .get(id)
            .await?
            .ok_or(BookingError::NotFound(id))
    }

    /// Write `next` only if the stored record is still `current`
    async fn commit(&self, current: &Booking, mut next: Booking) -> Result<Booking> {
        next.version = current.version + 1;
        next.updated_at = Some(Utc::now());

        if !self.bookings.compare_and_swap(&next, current.version).await? {
            tracing::debug!(booking = %current.id, "Lost compare-and-swap");
            return Err(BookingError::Conflict(format!(
                "Booking {} was modified concurrently",
                current.id
            )));
        }
        Ok(next)
    }

    /// `booking_updated` goes to the party on the other side of `actor`
    async fn notify_counterparty(&self, booking: &Booking, actor: Actor) {
        let audience = if booking.customer_id == actor.id {
            match booking.montir_id {
                Some(mechanic) => Audience::User(mechanic),
                None => Audience::Role(Role::Mechanic),
            }
        } else {
            Audience::User(booking.customer_id)
        };
        self.notify(audience, Event::BookingUpdated(booking.clone()))
            .await;
    }

    async fn notify(&self, audience: Audience, event: Event) {
        self.events.publish(Notification::new(audience, event)).await;
    }
}
