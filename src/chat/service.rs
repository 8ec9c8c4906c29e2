//! Chat service - conversations per booking and their message log

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::{ChatError, Conversation, MediaStore, Message};
use crate::models::Actor;
use crate::store::{BookingStore, ConversationStore};
use crate::websocket::{Audience, Event, EventSink, Notification};

pub struct ChatService {
    conversations: Arc<dyn ConversationStore>,
    bookings: Arc<dyn BookingStore>,
    events: Arc<dyn EventSink>,
    media: MediaStore,
}

impl ChatService {
    pub fn new(
        conversations: Arc<dyn ConversationStore>,
        bookings: Arc<dyn BookingStore>,
        events: Arc<dyn EventSink>,
        media: MediaStore,
    ) -> Self {
        Self {
            conversations,
            bookings,
            events,
            media,
        }
    }

    pub fn media(&self) -> &MediaStore {
        &self.media
    }

    /// Open the conversation of a booking, or return the existing one
    pub async fn create_conversation(
        &self,
        booking_id: Uuid,
        actor: Actor,
    ) -> Result<Conversation, ChatError> {
        let booking = self
            .bookings
            .get(booking_id)
            .await?
            .ok_or_else(|| ChatError::NotFound(format!("booking {}", booking_id)))?;

        if !booking.is_participant(actor.id) && !actor.is_admin() {
            return Err(ChatError::Forbidden(
                "Only booking participants can open its conversation".to_string(),
            ));
        }
        let montir_id = booking.montir_id.ok_or_else(|| {
            ChatError::Conflict("Booking has no mechanic assigned yet".to_string())
        })?;

        let conversation = self
            .conversations
            .get_or_create(Conversation {
                id: Uuid::new_v4(),
                booking_id,
                customer_id: booking.customer_id,
                montir_id,
                created_at: Utc::now(),
            })
            .await?;

        Ok(conversation)
    }

    pub async fn conversation_for_booking(
        &self,
        booking_id: Uuid,
        actor: Actor,
    ) -> Result<Conversation, ChatError> {
        let conversation = self
            .conversations
            .find_by_booking(booking_id)
            .await?
            .ok_or_else(|| ChatError::NotFound(format!("conversation for booking {}", booking_id)))?;
        authorize(&conversation, actor)?;
        Ok(conversation)
    }

    /// Fetch a conversation the caller takes part in (admins see all)
    pub async fn conversation(&self, id: Uuid, actor: Actor) -> Result<Conversation, ChatError> {
        let conversation = self
            .conversations
            .get(id)
            .await?
            .ok_or_else(|| ChatError::NotFound(format!("conversation {}", id)))?;
        authorize(&conversation, actor)?;
        Ok(conversation)
    }

    /// Append a message and relay it to the conversation room
    pub async fn post_message(
        &self,
        conversation_id: Uuid,
        sender: Actor,
        text: Option<String>,
        media_ref: Option<String>,
    ) -> Result<Message, ChatError> {
        let conversation = self
            .conversations
            .get(conversation_id)
            .await?
            .ok_or_else(|| ChatError::NotFound(format!("conversation {}", conversation_id)))?;
        if !conversation.is_participant(sender.id) {
            return Err(ChatError::Forbidden(
                "Only participants can post to this conversation".to_string(),
            ));
        }

        let text = text
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        if text.is_none() && media_ref.is_none() {
            return Err(ChatError::Validation {
                field: "text".to_string(),
                message: "a message needs text or an attachment".to_string(),
            });
        }

        let message = Message {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id: sender.id,
            text,
            media_ref,
            created_at: Utc::now(),
        };
        self.conversations.append_message(&message).await?;

        self.events
            .publish(Notification::new(
                Audience::Conversation(conversation_id),
                Event::ReceiveMessage(message.clone()),
            ))
            .await;

        Ok(message)
    }

    pub async fn list_messages(
        &self,
        conversation_id: Uuid,
        actor: Actor,
        limit: Option<u32>,
    ) -> Result<Vec<Message>, ChatError> {
        self.conversation(conversation_id, actor).await?;
        let messages = self
            .conversations
            .list_messages(conversation_id, limit)
            .await?;
        Ok(messages)
    }
}

fn authorize(conversation: &Conversation, actor: Actor) -> Result<(), ChatError> {
    if conversation.is_participant(actor.id) || actor.is_admin() {
        Ok(())
    } else {
        Err(ChatError::Forbidden(
            "Not a participant of this conversation".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::{
        Booking, BookingStatus, Location, PaymentStatus, ServiceCategory, ServiceType, Vehicle,
    };
    use crate::models::Role;
    use crate::store::{MemoryBookingStore, MemoryConversationStore};
    use crate::websocket::Hub;

    struct Fixture {
        service: ChatService,
        hub: Hub,
        bookings: Arc<MemoryBookingStore>,
        customer: Actor,
        mechanic: Actor,
    }

    fn fixture() -> Fixture {
        let bookings = Arc::new(MemoryBookingStore::default());
        let hub = Hub::new(8);
        let service = ChatService::new(
            Arc::new(MemoryConversationStore::default()),
            bookings.clone(),
            Arc::new(hub.clone()),
            MediaStore::new(std::env::temp_dir().join("montirku-chat-tests"), 1024),
        );
        Fixture {
            service,
            hub,
            bookings,
            customer: Actor::new(Uuid::new_v4(), Role::Customer),
            mechanic: Actor::new(Uuid::new_v4(), Role::Mechanic),
        }
    }

    impl Fixture {
        async fn booking(&self, montir_id: Option<Uuid>) -> Booking {
            let now = Utc::now();
            let booking = Booking {
                id: Uuid::new_v4(),
                customer_id: self.customer.id,
                montir_id,
                service_category: ServiceCategory::Towing,
                service_type: ServiceType::Standard,
                vehicle: Vehicle::default(),
                location: Location {
                    latitude: -7.25,
                    longitude: 112.75,
                    address: None,
                },
                description: None,
                scheduled_at: now,
                status: if montir_id.is_some() {
                    BookingStatus::Accepted
                } else {
                    BookingStatus::Pending
                },
                price: 0,
                payment_status: PaymentStatus::Unpaid,
                payment_reference: None,
                cancel_reason: None,
                review: None,
                created_at: now,
                updated_at: None,
                version: 0,
            };
            self.bookings.insert(&booking).await.unwrap();
            booking
        }
    }

    #[tokio::test]
    async fn test_conversation_is_one_per_booking() {
        let f = fixture();
        let booking = f.booking(Some(f.mechanic.id)).await;

        let first = f
            .service
            .create_conversation(booking.id, f.customer)
            .await
            .unwrap();
        let second = f
            .service
            .create_conversation(booking.id, f.mechanic)
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.montir_id, f.mechanic.id);

        let found = f
            .service
            .conversation_for_booking(booking.id, f.customer)
            .await
            .unwrap();
        assert_eq!(found.id, first.id);
    }

    #[tokio::test]
    async fn test_unclaimed_booking_has_no_conversation() {
        let f = fixture();
        let booking = f.booking(None).await;
        let err = f
            .service
            .create_conversation(booking.id, f.customer)
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_outsiders_are_rejected() {
        let f = fixture();
        let booking = f.booking(Some(f.mechanic.id)).await;
        let outsider = Actor::new(Uuid::new_v4(), Role::Mechanic);

        let err = f
            .service
            .create_conversation(booking.id, outsider)
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Forbidden(_)));

        let conversation = f
            .service
            .create_conversation(booking.id, f.customer)
            .await
            .unwrap();
        let err = f
            .service
            .post_message(conversation.id, outsider, Some("hi".to_string()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Forbidden(_)));

        let admin = Actor::new(Uuid::new_v4(), Role::Admin);
        assert!(f.service.conversation(conversation.id, admin).await.is_ok());
    }

    #[tokio::test]
    async fn test_messages_need_content() {
        let f = fixture();
        let booking = f.booking(Some(f.mechanic.id)).await;
        let conversation = f
            .service
            .create_conversation(booking.id, f.customer)
            .await
            .unwrap();

        let err = f
            .service
            .post_message(conversation.id, f.customer, Some("   ".to_string()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Validation { .. }));

        let media_only = f
            .service
            .post_message(
                conversation.id,
                f.customer,
                None,
                Some("/uploads/x.png".to_string()),
            )
            .await
            .unwrap();
        assert_eq!(media_only.text, None);
    }

    #[tokio::test]
    async fn test_posted_message_reaches_joined_sessions_only() {
        let f = fixture();
        let booking = f.booking(Some(f.mechanic.id)).await;
        let conversation = f
            .service
            .create_conversation(booking.id, f.customer)
            .await
            .unwrap();

        let (joined, mut joined_rx) = f.hub.connect(f.mechanic.id, Role::Mechanic).await;
        let (_idle, mut idle_rx) = f.hub.connect(f.customer.id, Role::Customer).await;
        f.hub.join_conversation(joined, conversation.id).await.unwrap();

        let message = f
            .service
            .post_message(conversation.id, f.customer, Some("On my way?".to_string()), None)
            .await
            .unwrap();

        match joined_rx.try_recv().unwrap() {
            crate::websocket::ServerMessage::Event { event, data } => {
                assert_eq!(event, "receive_message");
                assert_eq!(data["id"], message.id.to_string());
            }
            other => panic!("unexpected frame: {:?}", other),
        }
        assert!(idle_rx.try_recv().is_err());

        // History does not depend on joining
        let history = f
            .service
            .list_messages(conversation.id, f.customer, None)
            .await
            .unwrap();
        assert_eq!(history, vec![message]);
    }
}
