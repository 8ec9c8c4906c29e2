//! Session registry and room fan-out
//!
//! Every connected socket owns one bounded channel. The hub keeps three maps
//! under a single lock: sessions, user rooms and conversation rooms. Pushes
//! never block a request: a full or closed channel drops the event.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::booking::Booking;
use crate::chat::Message;
use crate::models::Role;

pub type SessionId = Uuid;

/// Who an event is addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Audience {
    /// Every connected session of this role
    Role(Role),
    /// Sessions that joined this account's room
    User(Uuid),
    /// Sessions that joined this conversation
    Conversation(Uuid),
}

/// Domain events pushed to clients
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    NewBooking(Booking),
    BookingUpdated(Booking),
    TransactionSuccess(Booking),
    ReceiveMessage(Message),
}

impl Event {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            Event::NewBooking(_) => "new_booking",
            Event::BookingUpdated(_) => "booking_updated",
            Event::TransactionSuccess(_) => "transaction_success",
            Event::ReceiveMessage(_) => "receive_message",
        }
    }

    pub fn payload(&self) -> Value {
        let encoded = match self {
            Event::NewBooking(booking)
            | Event::BookingUpdated(booking)
            | Event::TransactionSuccess(booking) => serde_json::to_value(booking),
            Event::ReceiveMessage(message) => serde_json::to_value(message),
        };
        encoded.unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub audience: Audience,
    pub event: Event,
}

impl Notification {
    pub fn new(audience: Audience, event: Event) -> Self {
        Self { audience, event }
    }
}

/// Where services hand off events after a successful mutation
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, notification: Notification);
}

/// Frames sent from the server to a socket
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Event { event: String, data: Value },
    Joined { room: String },
    Left { room: String },
    Pong,
    Error { message: String },
}

impl From<&Event> for ServerMessage {
    fn from(event: &Event) -> Self {
        ServerMessage::Event {
            event: event.name().to_string(),
            data: event.payload(),
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum HubError {
    #[error("Unknown session {0}")]
    UnknownSession(SessionId),

    #[error("Not allowed to join room {0}")]
    Forbidden(String),
}

struct Session {
    account_id: Uuid,
    role: Role,
    tx: mpsc::Sender<ServerMessage>,
    user_room: Option<Uuid>,
    conversations: HashSet<Uuid>,
}

#[derive(Default)]
struct Registry {
    sessions: HashMap<SessionId, Session>,
    user_rooms: HashMap<Uuid, HashSet<SessionId>>,
    conversation_rooms: HashMap<Uuid, HashSet<SessionId>>,
}

/// Notification hub shared by the socket handler and the services
#[derive(Clone)]
pub struct Hub {
    registry: Arc<RwLock<Registry>>,
    channel_capacity: usize,
}

impl Hub {
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            registry: Arc::new(RwLock::new(Registry::default())),
            channel_capacity: channel_capacity.max(1),
        }
    }

    /// Register a socket for an authenticated account
    pub async fn connect(
        &self,
        account_id: Uuid,
        role: Role,
    ) -> (SessionId, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let session_id = Uuid::new_v4();
        self.registry.write().await.sessions.insert(
            session_id,
            Session {
                account_id,
                role,
                tx,
                user_room: None,
                conversations: HashSet::new(),
            },
        );
        tracing::info!(session = %session_id, account = %account_id, "Socket connected");
        (session_id, rx)
    }

    /// Join the personal room of `user_id`. Only admins may join someone
    /// else's room.
    pub async fn join_user_room(&self, session_id: SessionId, user_id: Uuid) -> Result<(), HubError> {
        let mut registry = self.registry.write().await;
        let session = registry
            .sessions
            .get_mut(&session_id)
            .ok_or(HubError::UnknownSession(session_id))?;

        if session.account_id != user_id && session.role != Role::Admin {
            return Err(HubError::Forbidden(user_id.to_string()));
        }

        let previous = session.user_room.replace(user_id);
        if let Some(previous) = previous.filter(|p| *p != user_id) {
            remove_member(&mut registry.user_rooms, previous, session_id);
        }
        registry
            .user_rooms
            .entry(user_id)
            .or_default()
            .insert(session_id);
        Ok(())
    }

    /// Authorization is the caller's job
    pub async fn join_conversation(
        &self,
        session_id: SessionId,
        conversation_id: Uuid,
    ) -> Result<(), HubError> {
        let mut registry = self.registry.write().await;
        let session = registry
            .sessions
            .get_mut(&session_id)
            .ok_or(HubError::UnknownSession(session_id))?;
        session.conversations.insert(conversation_id);
        registry
            .conversation_rooms
            .entry(conversation_id)
            .or_default()
            .insert(session_id);
        Ok(())
    }

    /// Returns false when the session was not in the room
    pub async fn leave_conversation(&self, session_id: SessionId, conversation_id: Uuid) -> bool {
        let mut registry = self.registry.write().await;
        let was_member = match registry.sessions.get_mut(&session_id) {
            Some(session) => session.conversations.remove(&conversation_id),
            None => false,
        };
        if was_member {
            remove_member(&mut registry.conversation_rooms, conversation_id, session_id);
        }
        was_member
    }

    pub async fn disconnect(&self, session_id: SessionId) {
        let mut registry = self.registry.write().await;
        let Some(session) = registry.sessions.remove(&session_id) else {
            return;
        };
        if let Some(user_id) = session.user_room {
            remove_member(&mut registry.user_rooms, user_id, session_id);
        }
        for conversation_id in session.conversations {
            remove_member(&mut registry.conversation_rooms, conversation_id, session_id);
        }
        tracing::info!(session = %session_id, "Socket disconnected");
    }

    pub async fn broadcast_to_role(&self, role: Role, message: ServerMessage) -> usize {
        let registry = self.registry.read().await;
        let targets = registry
            .sessions
            .iter()
            .filter(|(_, s)| s.role == role)
            .map(|(id, s)| (*id, &s.tx));
        deliver(targets, &message)
    }

    pub async fn send_to_user(&self, user_id: Uuid, message: ServerMessage) -> usize {
        let registry = self.registry.read().await;
        let Some(members) = registry.user_rooms.get(&user_id) else {
            return 0;
        };
        let targets = members
            .iter()
            .filter_map(|id| registry.sessions.get(id).map(|s| (*id, &s.tx)));
        deliver(targets, &message)
    }

    pub async fn send_to_conversation(&self, conversation_id: Uuid, message: ServerMessage) -> usize {
        let registry = self.registry.read().await;
        let Some(members) = registry.conversation_rooms.get(&conversation_id) else {
            return 0;
        };
        let targets = members
            .iter()
            .filter_map(|id| registry.sessions.get(id).map(|s| (*id, &s.tx)));
        deliver(targets, &message)
    }

    /// Route a notification to its audience
    pub async fn dispatch(&self, notification: &Notification) -> usize {
        let message = ServerMessage::from(&notification.event);
        let delivered = match notification.audience {
            Audience::Role(role) => self.broadcast_to_role(role, message).await,
            Audience::User(user_id) => self.send_to_user(user_id, message).await,
            Audience::Conversation(id) => self.send_to_conversation(id, message).await,
        };
        tracing::debug!(
            event = notification.event.name(),
            audience = ?notification.audience,
            delivered,
            "Event dispatched"
        );
        delivered
    }

    pub async fn session_count(&self) -> usize {
        self.registry.read().await.sessions.len()
    }
}

#[async_trait]
impl EventSink for Hub {
    async fn publish(&self, notification: Notification) {
        self.dispatch(&notification).await;
    }
}

fn remove_member(rooms: &mut HashMap<Uuid, HashSet<SessionId>>, room: Uuid, session_id: SessionId) {
    if let Some(members) = rooms.get_mut(&room) {
        members.remove(&session_id);
        if members.is_empty() {
            rooms.remove(&room);
        }
    }
}

fn deliver<'a>(
    targets: impl Iterator<Item = (SessionId, &'a mpsc::Sender<ServerMessage>)>,
    message: &ServerMessage,
) -> usize {
    let mut delivered = 0;
    for (session_id, tx) in targets {
        match tx.try_send(message.clone()) {
            Ok(()) => delivered += 1,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(session = %session_id, "Session queue full, dropping event");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(session = %session_id, "Session closed, dropping event");
            }
        }
    }
    delivered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::Message;
    use chrono::Utc;

    fn message_event(conversation_id: Uuid) -> Event {
        Event::ReceiveMessage(Message {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id: Uuid::new_v4(),
            text: Some("halo".to_string()),
            media_ref: None,
            created_at: Utc::now(),
        })
    }

    #[tokio::test]
    async fn test_user_events_require_joining_the_room() {
        let hub = Hub::new(8);
        let account = Uuid::new_v4();
        let (session, mut rx) = hub.connect(account, Role::Customer).await;

        let event = ServerMessage::Pong;
        assert_eq!(hub.send_to_user(account, event.clone()).await, 0);
        assert!(rx.try_recv().is_err());

        hub.join_user_room(session, account).await.unwrap();
        assert_eq!(hub.send_to_user(account, event.clone()).await, 1);
        assert_eq!(rx.try_recv().unwrap(), event);
    }

    #[tokio::test]
    async fn test_cannot_join_someone_elses_room() {
        let hub = Hub::new(8);
        let (session, _rx) = hub.connect(Uuid::new_v4(), Role::Mechanic).await;
        let result = hub.join_user_room(session, Uuid::new_v4()).await;
        assert!(matches!(result, Err(HubError::Forbidden(_))));

        let (admin, _admin_rx) = hub.connect(Uuid::new_v4(), Role::Admin).await;
        assert!(hub.join_user_room(admin, Uuid::new_v4()).await.is_ok());
    }

    #[tokio::test]
    async fn test_role_broadcast_only_reaches_that_role() {
        let hub = Hub::new(8);
        let (_m1, mut mechanic_one) = hub.connect(Uuid::new_v4(), Role::Mechanic).await;
        let (_m2, mut mechanic_two) = hub.connect(Uuid::new_v4(), Role::Mechanic).await;
        let (_c, mut customer) = hub.connect(Uuid::new_v4(), Role::Customer).await;

        let delivered = hub.broadcast_to_role(Role::Mechanic, ServerMessage::Pong).await;
        assert_eq!(delivered, 2);
        assert!(mechanic_one.try_recv().is_ok());
        assert!(mechanic_two.try_recv().is_ok());
        assert!(customer.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_conversation_join_and_leave() {
        let hub = Hub::new(8);
        let conversation = Uuid::new_v4();
        let (session, mut rx) = hub.connect(Uuid::new_v4(), Role::Customer).await;

        hub.join_conversation(session, conversation).await.unwrap();
        let delivered = hub
            .dispatch(&Notification::new(
                Audience::Conversation(conversation),
                message_event(conversation),
            ))
            .await;
        assert_eq!(delivered, 1);
        match rx.try_recv().unwrap() {
            ServerMessage::Event { event, data } => {
                assert_eq!(event, "receive_message");
                assert_eq!(data["text"], "halo");
            }
            other => panic!("unexpected frame: {:?}", other),
        }

        assert!(hub.leave_conversation(session, conversation).await);
        assert!(!hub.leave_conversation(session, conversation).await);
        assert_eq!(
            hub.send_to_conversation(conversation, ServerMessage::Pong).await,
            0
        );
    }

    #[tokio::test]
    async fn test_disconnect_clears_every_room() {
        let hub = Hub::new(8);
        let account = Uuid::new_v4();
        let conversation = Uuid::new_v4();
        let (session, _rx) = hub.connect(account, Role::Customer).await;
        hub.join_user_room(session, account).await.unwrap();
        hub.join_conversation(session, conversation).await.unwrap();

        hub.disconnect(session).await;

        assert_eq!(hub.session_count().await, 0);
        assert_eq!(hub.send_to_user(account, ServerMessage::Pong).await, 0);
        assert_eq!(
            hub.send_to_conversation(conversation, ServerMessage::Pong).await,
            0
        );
        assert!(matches!(
            hub.join_conversation(session, conversation).await,
            Err(HubError::UnknownSession(_))
        ));
    }

    #[tokio::test]
    async fn test_full_queue_drops_instead_of_blocking() {
        let hub = Hub::new(1);
        let account = Uuid::new_v4();
        let (session, mut rx) = hub.connect(account, Role::Customer).await;
        hub.join_user_room(session, account).await.unwrap();

        assert_eq!(hub.send_to_user(account, ServerMessage::Pong).await, 1);
        assert_eq!(hub.send_to_user(account, ServerMessage::Pong).await, 0);
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_event_frame_shape() {
        let conversation = Uuid::new_v4();
        let frame = ServerMessage::from(&message_event(conversation));
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], "event");
        assert_eq!(json["event"], "receive_message");
        assert_eq!(json["data"]["conversation_id"], conversation.to_string());
    }
}
