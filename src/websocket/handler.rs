//! `GET /ws` upgrade and per-socket tasks

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::hub::{Hub, HubError, ServerMessage, SessionId};
use crate::auth::AuthService;
use crate::chat::ChatService;
use crate::error::ApiError;
use crate::models::Actor;

/// State the socket endpoint needs
#[derive(Clone)]
pub struct WsState {
    pub hub: Hub,
    pub auth_service: Arc<AuthService>,
    pub chat_service: Arc<ChatService>,
}

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

/// Frames accepted from a socket
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    JoinUserRoom { user_id: Uuid },
    JoinConversation { conversation_id: Uuid },
    LeaveConversation { conversation_id: Uuid },
    Ping,
}

/// Authenticates the token query parameter, then upgrades
pub async fn ws_handler(
    State(state): State<WsState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let token = query
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Missing token".to_string()))?;

    let actor = state
        .auth_service
        .verify_token(&token)
        .map_err(|e| ApiError::Forbidden(e.to_string()))?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, actor)))
}

async fn handle_socket(socket: WebSocket, state: WsState, actor: Actor) {
    let (session_id, mut events) = state.hub.connect(actor.id, actor.role).await;
    let (mut sender, mut receiver) = socket.split();

    // Replies to client frames share the socket with hub events
    let (reply_tx, mut reply_rx) = mpsc::channel::<ServerMessage>(32);

    let mut send_task = tokio::spawn(async move {
        loop {
            let frame = tokio::select! {
                Some(frame) = events.recv() => frame,
                Some(frame) = reply_rx.recv() => frame,
                else => break,
            };
            let text = match serde_json::to_string(&frame) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!("Failed to encode socket frame: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let recv_state = state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    let reply = handle_client_frame(&recv_state, session_id, actor, &text).await;
                    if reply_tx.send(reply).await.is_err() {
                        break;
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    }

    state.hub.disconnect(session_id).await;
}

async fn handle_client_frame(
    state: &WsState,
    session_id: SessionId,
    actor: Actor,
    text: &str,
) -> ServerMessage {
    let frame = match serde_json::from_str::<ClientMessage>(text) {
        Ok(frame) => frame,
        Err(e) => {
            return ServerMessage::Error {
                message: format!("Invalid message: {}", e),
            }
        }
    };

    match frame {
        ClientMessage::JoinUserRoom { user_id } => {
            match state.hub.join_user_room(session_id, user_id).await {
                Ok(()) => ServerMessage::Joined {
                    room: format!("user:{}", user_id),
                },
                Err(e) => hub_error(e),
            }
        }
        ClientMessage::JoinConversation { conversation_id } => {
            if let Err(e) = state.chat_service.conversation(conversation_id, actor).await {
                return ServerMessage::Error {
                    message: e.to_string(),
                };
            }
            match state.hub.join_conversation(session_id, conversation_id).await {
                Ok(()) => ServerMessage::Joined {
                    room: format!("conversation:{}", conversation_id),
                },
                Err(e) => hub_error(e),
            }
        }
        ClientMessage::LeaveConversation { conversation_id } => {
            state.hub.leave_conversation(session_id, conversation_id).await;
            ServerMessage::Left {
                room: format!("conversation:{}", conversation_id),
            }
        }
        ClientMessage::Ping => {
            tracing::debug!(session = %session_id, "Ping");
            ServerMessage::Pong
        }
    }
}

fn hub_error(err: HubError) -> ServerMessage {
    ServerMessage::Error {
        message: err.to_string(),
    }
}
