//! Conversation and message models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One conversation per booking, between its customer and mechanic
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone, PartialEq)]
pub struct Conversation {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub customer_id: Uuid,
    pub montir_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn is_participant(&self, account_id: Uuid) -> bool {
        self.customer_id == account_id || self.montir_id == account_id
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone, PartialEq)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub text: Option<String>,
    pub media_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateConversationRequest {
    pub booking_id: Uuid,
}

#[derive(Debug, Default, Deserialize)]
pub struct MessagesQuery {
    /// Return only the newest `limit` messages
    pub limit: Option<u32>,
}
