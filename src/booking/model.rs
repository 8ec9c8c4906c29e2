//! Booking models and data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::models::PaginationParams;

/// Booking lifecycle status
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq, Hash)]
#[sqlx(type_name = "booking_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,         // Awaiting a mechanic
    Accepted,        // Claimed, standard service
    WaitingApproval, // Claimed, estimate awaiting customer approval
    Approved,        // Customer approved the estimate
    OnTheWay,        // Mechanic departed
    InProgress,      // Work started
    Completed,       // Terminal success
    Cancelled,       // Terminal
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 8] = [
        BookingStatus::Pending,
        BookingStatus::Accepted,
        BookingStatus::WaitingApproval,
        BookingStatus::Approved,
        BookingStatus::OnTheWay,
        BookingStatus::InProgress,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Accepted => "accepted",
            BookingStatus::WaitingApproval => "waiting_approval",
            BookingStatus::Approved => "approved",
            BookingStatus::OnTheWay => "on_the_way",
            BookingStatus::InProgress => "in_progress",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the customer asked for
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "service_category", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ServiceCategory {
    Mechanic,
    Towing,
}

/// Whether the job is priced up front or needs an estimate first
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq, Default)]
#[sqlx(type_name = "service_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    #[default]
    Standard,
    Routine,
}

#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq, Default)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Vehicle {
    pub make: Option<String>,
    pub model: Option<String>,
    pub plate: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
}

impl Location {
    pub fn in_range(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Review {
    pub rating: u8,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Booking model
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Booking {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub montir_id: Option<Uuid>,
    pub service_category: ServiceCategory,
    pub service_type: ServiceType,
    pub vehicle: Vehicle,
    pub location: Location,
    pub description: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub status: BookingStatus,
    pub price: i64, // minor currency units
    pub payment_status: PaymentStatus,
    pub payment_reference: Option<String>,
    pub cancel_reason: Option<String>,
    pub review: Option<Review>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub version: i64,
}

impl Booking {
    pub fn is_participant(&self, account_id: Uuid) -> bool {
        self.customer_id == account_id || self.montir_id == Some(account_id)
    }

    pub fn is_unclaimed(&self) -> bool {
        self.status == BookingStatus::Pending && self.montir_id.is_none()
    }
}

/// Request DTO for creating a booking
#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub service_category: ServiceCategory,
    #[serde(default)]
    pub service_type: ServiceType,
    #[serde(default)]
    pub vehicle: Vehicle,
    pub location: Option<Location>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
}

/// Body of `PATCH /bookings/:id`
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BookingPatch {
    Claim,
    Estimate {
        price: i64,
    },
    Advance {
        status: BookingStatus,
    },
    Cancel {
        reason: Option<String>,
    },
    Review {
        rating: u8,
        comment: Option<String>,
    },
}

/// Query parameters for listing bookings
#[derive(Debug, Default, Deserialize)]
pub struct ListBookingsQuery {
    pub user_id: Option<Uuid>,
    pub status: Option<BookingStatus>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ListBookingsQuery {
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams {
            page: self.page,
            limit: self.limit,
        }
    }
}

/// Store-level listing filter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingFilter {
    /// Customer or assigned mechanic
    pub participant: Option<Uuid>,
    pub status: Option<BookingStatus>,
    /// Only bookings without a mechanic
    pub unassigned: bool,
    pub limit: u32,
    pub offset: u32,
}

impl BookingFilter {
    pub fn matches(&self, booking: &Booking) -> bool {
        if let Some(account) = self.participant {
            if !booking.is_participant(account) {
                return false;
            }
        }
        if let Some(status) = self.status {
            if booking.status != status {
                return false;
            }
        }
        !(self.unassigned && booking.montir_id.is_some())
    }
}
