//! Booking domain module
//!
//! Models, the status graph, pricing policies and the lifecycle service.

pub mod lifecycle;
mod model;
pub mod pricing;
mod service;

use thiserror::Error;
use uuid::Uuid;

pub use model::*;
pub use pricing::{FlatRate, PricingPolicy, ZeroUntilEstimated};
pub use service::BookingService;

use crate::payment::PaymentError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    #[error("Booking {0} not found")]
    NotFound(Uuid),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    IllegalTransition(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Payment failed: {0}")]
    Upstream(String),

    #[error("Booking task failed: {0}")]
    Interrupted(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BookingError {
    pub(crate) fn validation(field: &str, message: &str) -> Self {
        BookingError::Validation {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

impl From<PaymentError> for BookingError {
    fn from(err: PaymentError) -> Self {
        BookingError::Upstream(err.to_string())
    }
}
