//! Pricing policies applied when a mechanic claims a booking

use super::model::{Booking, ServiceCategory, ServiceType};
use crate::config::PricingMode;

/// Decides the initial price of a claimed standard booking.
///
/// Routine bookings are always priced through an explicit estimate, so
/// policies are only consulted for [`ServiceType::Standard`].
pub trait PricingPolicy: Send + Sync {
    fn price_on_claim(&self, booking: &Booking) -> i64;
}

/// Leaves the price untouched until the mechanic sets an estimate
#[derive(Debug, Default, Clone, Copy)]
pub struct ZeroUntilEstimated;

impl PricingPolicy for ZeroUntilEstimated {
    fn price_on_claim(&self, booking: &Booking) -> i64 {
        booking.price
    }
}

/// Fixed price per service category
#[derive(Debug, Clone, Copy)]
pub struct FlatRate {
    pub mechanic: i64,
    pub towing: i64,
}

impl PricingPolicy for FlatRate {
    fn price_on_claim(&self, booking: &Booking) -> i64 {
        let rate = match booking.service_category {
            ServiceCategory::Mechanic => self.mechanic,
            ServiceCategory::Towing => self.towing,
        };
        rate.max(0)
    }
}

/// Build the policy selected in configuration
pub fn from_mode(mode: PricingMode) -> Box<dyn PricingPolicy> {
    match mode {
        PricingMode::ZeroUntilEstimated => Box::new(ZeroUntilEstimated),
        PricingMode::FlatRate { mechanic, towing } => Box::new(FlatRate { mechanic, towing }),
    }
}

pub(crate) fn needs_estimate(booking: &Booking) -> bool {
    booking.service_type == ServiceType::Routine
}
