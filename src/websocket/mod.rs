//! Real-time notification fan-out over WebSocket

pub mod handler;
pub mod hub;

pub use handler::{ws_handler, WsState};
pub use hub::{Audience, Event, EventSink, Hub, HubError, Notification, ServerMessage, SessionId};
