//! Payment gateway seam
//!
//! Only a mock gateway ships. It approves every positive charge and hands
//! back a random receipt reference.

use async_trait::async_trait;
use rand::{distributions::Alphanumeric, Rng};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Charge rejected: {0}")]
    Rejected(String),

    #[error("Payment gateway unavailable: {0}")]
    Unavailable(String),
}

/// Successful charge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub reference: String,
    pub amount: i64,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Charge `amount` minor units for `booking_id`
    async fn charge(&self, booking_id: Uuid, amount: i64) -> Result<Receipt, PaymentError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MockPaymentGateway;

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn charge(&self, booking_id: Uuid, amount: i64) -> Result<Receipt, PaymentError> {
        if amount <= 0 {
            return Err(PaymentError::Rejected(format!(
                "amount must be positive, got {}",
                amount
            )));
        }

        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(12)
            .map(char::from)
            .collect();
        let reference = format!("mock_{}", suffix.to_lowercase());

        tracing::info!(booking = %booking_id, amount, reference = %reference, "Mock charge approved");

        Ok(Receipt { reference, amount })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_charge_returns_reference() {
        let receipt = MockPaymentGateway
            .charge(Uuid::new_v4(), 150_000)
            .await
            .unwrap();
        assert!(receipt.reference.starts_with("mock_"));
        assert_eq!(receipt.reference.len(), "mock_".len() + 12);
        assert_eq!(receipt.amount, 150_000);
    }

    #[tokio::test]
    async fn test_mock_rejects_zero_amount() {
        let result = MockPaymentGateway.charge(Uuid::new_v4(), 0).await;
        assert!(matches!(result, Err(PaymentError::Rejected(_))));
    }
}
