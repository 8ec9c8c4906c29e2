//! Repository traits and their backends
//!
//! Services only see `Arc<dyn …Store>` handles. [`Stores::in_memory`] is used
//! when no database is configured and in tests; [`Stores::postgres`] backs the
//! same traits with sqlx.

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::booking::{Booking, BookingFilter};
use crate::chat::{Conversation, Message};
use crate::models::Account;
use crate::workshop::Workshop;

mod memory;
mod postgres;

pub use memory::{
    MemoryAccountStore, MemoryBookingStore, MemoryConversationStore, MemoryWorkshopStore,
};
pub use postgres::{PgAccountStore, PgBookingStore, PgConversationStore, PgWorkshopStore};

/// Store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Duplicate(db.message().to_string())
            }
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Fails with [`StoreError::Duplicate`] when the email is taken
    async fn insert(&self, account: &Account) -> StoreResult<()>;
    async fn get(&self, id: Uuid) -> StoreResult<Option<Account>>;
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>>;
    async fn update(&self, account: &Account) -> StoreResult<()>;
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn insert(&self, booking: &Booking) -> StoreResult<()>;
    async fn get(&self, id: Uuid) -> StoreResult<Option<Booking>>;
    /// Newest first
    async fn list(&self, filter: &BookingFilter) -> StoreResult<Vec<Booking>>;
    /// Replace the stored record only if its version still equals
    /// `expected_version`. Returns false when the record changed or vanished.
    async fn compare_and_swap(&self, booking: &Booking, expected_version: i64)
        -> StoreResult<bool>;
}

#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Insert `conversation` unless one already exists for its booking, in
    /// which case the existing one is returned.
    async fn get_or_create(&self, conversation: Conversation) -> StoreResult<Conversation>;
    async fn get(&self, id: Uuid) -> StoreResult<Option<Conversation>>;
    async fn find_by_booking(&self, booking_id: Uuid) -> StoreResult<Option<Conversation>>;
    async fn append_message(&self, message: &Message) -> StoreResult<()>;
    /// Insertion order; only the newest `limit` when given
    async fn list_messages(
        &self,
        conversation_id: Uuid,
        limit: Option<u32>,
    ) -> StoreResult<Vec<Message>>;
}

#[async_trait]
pub trait WorkshopStore: Send + Sync {
    async fn insert(&self, workshop: &Workshop) -> StoreResult<()>;
    async fn get(&self, id: Uuid) -> StoreResult<Option<Workshop>>;
    /// Ordered by name
    async fn list(&self) -> StoreResult<Vec<Workshop>>;
    async fn update(&self, workshop: &Workshop) -> StoreResult<bool>;
    async fn delete(&self, id: Uuid) -> StoreResult<bool>;
}

/// Bundle of store handles injected into the services
#[derive(Clone)]
pub struct Stores {
    pub accounts: Arc<dyn AccountStore>,
    pub bookings: Arc<dyn BookingStore>,
    pub conversations: Arc<dyn ConversationStore>,
    pub workshops: Arc<dyn WorkshopStore>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            accounts: Arc::new(MemoryAccountStore::default()),
            bookings: Arc::new(MemoryBookingStore::default()),
            conversations: Arc::new(MemoryConversationStore::default()),
            workshops: Arc::new(MemoryWorkshopStore::default()),
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self {
            accounts: Arc::new(PgAccountStore::new(pool.clone())),
            bookings: Arc::new(PgBookingStore::new(pool.clone())),
            conversations: Arc::new(PgConversationStore::new(pool.clone())),
            workshops: Arc::new(PgWorkshopStore::new(pool)),
        }
    }
}
