//! In-memory stores keyed by id

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    AccountStore, BookingStore, ConversationStore, StoreError, StoreResult, WorkshopStore,
};
use crate::booking::{Booking, BookingFilter};
use crate::chat::{Conversation, Message};
use crate::models::Account;
use crate::workshop::Workshop;

#[derive(Default)]
pub struct MemoryAccountStore {
    accounts: RwLock<HashMap<Uuid, Account>>,
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn insert(&self, account: &Account) -> StoreResult<()> {
        let mut accounts = self.accounts.write().await;
        if accounts.values().any(|a| a.email == account.email) {
            return Err(StoreError::Duplicate(format!("email {}", account.email)));
        }
        accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Account>> {
        Ok(self.accounts.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts.values().find(|a| a.email == email).cloned())
    }

    async fn update(&self, account: &Account) -> StoreResult<()> {
        let mut accounts = self.accounts.write().await;
        if accounts
            .values()
            .any(|a| a.id != account.id && a.email == account.email)
        {
            return Err(StoreError::Duplicate(format!("email {}", account.email)));
        }
        accounts.insert(account.id, account.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryBookingStore {
    bookings: RwLock<HashMap<Uuid, Booking>>,
}

#[async_trait]
impl BookingStore for MemoryBookingStore {
    async fn insert(&self, booking: &Booking) -> StoreResult<()> {
        let mut bookings = self.bookings.write().await;
        if bookings.contains_key(&booking.id) {
            return Err(StoreError::Duplicate(format!("booking {}", booking.id)));
        }
        bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        Ok(self.bookings.read().await.get(&id).cloned())
    }

    async fn list(&self, filter: &BookingFilter) -> StoreResult<Vec<Booking>> {
        let bookings = self.bookings.read().await;
        let mut matched: Vec<Booking> = bookings
            .values()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(matched
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .collect())
    }

    async fn compare_and_swap(
        &self,
        booking: &Booking,
        expected_version: i64,
    ) -> StoreResult<bool> {
        let mut bookings = self.bookings.write().await;
        match bookings.get_mut(&booking.id) {
            Some(current) if current.version == expected_version => {
                *current = booking.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[derive(Default)]
struct ConversationTables {
    conversations: HashMap<Uuid, Conversation>,
    by_booking: HashMap<Uuid, Uuid>,
    messages: HashMap<Uuid, Vec<Message>>,
}

#[derive(Default)]
pub struct MemoryConversationStore {
    tables: RwLock<ConversationTables>,
}

#[async_trait]
impl ConversationStore for MemoryConversationStore {
    async fn get_or_create(&self, conversation: Conversation) -> StoreResult<Conversation> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables
            .by_booking
            .get(&conversation.booking_id)
            .and_then(|id| tables.conversations.get(id))
        {
            return Ok(existing.clone());
        }
        tables
            .by_booking
            .insert(conversation.booking_id, conversation.id);
        tables
            .conversations
            .insert(conversation.id, conversation.clone());
        Ok(conversation)
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Conversation>> {
        Ok(self.tables.read().await.conversations.get(&id).cloned())
    }

    async fn find_by_booking(&self, booking_id: Uuid) -> StoreResult<Option<Conversation>> {
        let tables = self.tables.read().await;
        Ok(tables
            .by_booking
            .get(&booking_id)
            .and_then(|id| tables.conversations.get(id))
            .cloned())
    }

    async fn append_message(&self, message: &Message) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .messages
            .entry(message.conversation_id)
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn list_messages(
        &self,
        conversation_id: Uuid,
        limit: Option<u32>,
    ) -> StoreResult<Vec<Message>> {
        let tables = self.tables.read().await;
        let all = match tables.messages.get(&conversation_id) {
            Some(messages) => messages.as_slice(),
            None => return Ok(Vec::new()),
        };
        let skip = limit
            .map(|l| all.len().saturating_sub(l as usize))
            .unwrap_or(0);
        Ok(all[skip..].to_vec())
    }
}

#[derive(Default)]
pub struct MemoryWorkshopStore {
    workshops: RwLock<HashMap<Uuid, Workshop>>,
}

#[async_trait]
impl WorkshopStore for MemoryWorkshopStore {
    async fn insert(&self, workshop: &Workshop) -> StoreResult<()> {
        self.workshops
            .write()
            .await
            .insert(workshop.id, workshop.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Workshop>> {
        Ok(self.workshops.read().await.get(&id).cloned())
    }

    async fn list(&self) -> StoreResult<Vec<Workshop>> {
        let mut all: Vec<Workshop> = self.workshops.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    async fn update(&self, workshop: &Workshop) -> StoreResult<bool> {
        let mut workshops = self.workshops.write().await;
        match workshops.get_mut(&workshop.id) {
            Some(current) => {
                *current = workshop.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.workshops.write().await.remove(&id).is_some())
    }
}
