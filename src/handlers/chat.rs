//! Conversation and message handlers

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::AuthenticatedUser;
use crate::chat::{Conversation, CreateConversationRequest, Message, MessagesQuery};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// POST /conversations - Open (or fetch) the conversation of a booking
pub async fn create_conversation(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<CreateConversationRequest>,
) -> ApiResult<(StatusCode, Json<Conversation>)> {
    let conversation = state
        .chat_service
        .create_conversation(req.booking_id, user.actor())
        .await?;
    Ok((StatusCode::CREATED, Json(conversation)))
}

/// GET /conversations/booking/:booking_id
pub async fn get_conversation_by_booking(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(booking_id): Path<Uuid>,
) -> ApiResult<Json<Conversation>> {
    let conversation = state
        .chat_service
        .conversation_for_booking(booking_id, user.actor())
        .await?;
    Ok(Json(conversation))
}

/// GET /messages/:conversation_id - History in insertion order
pub async fn list_messages(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(conversation_id): Path<Uuid>,
    Query(query): Query<MessagesQuery>,
) -> ApiResult<Json<Vec<Message>>> {
    let messages = state
        .chat_service
        .list_messages(conversation_id, user.actor(), query.limit)
        .await?;
    Ok(Json(messages))
}

struct Upload {
    content_type: String,
    bytes: Vec<u8>,
}

/// POST /messages - multipart with `conversation_id`, `text` and `file`
pub async fn post_message(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Message>)> {
    let mut conversation_id = None;
    let mut text = None;
    let mut upload = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("conversation_id") => {
                let raw = field.text().await.map_err(multipart_error)?;
                let id = Uuid::parse_str(raw.trim())
                    .map_err(|_| ApiError::field("conversation_id", "must be a UUID"))?;
                conversation_id = Some(id);
            }
            Some("text") => text = Some(field.text().await.map_err(multipart_error)?),
            Some("file") => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                upload = Some(Upload {
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            _ => {}
        }
    }

    let conversation_id =
        conversation_id.ok_or_else(|| ApiError::field("conversation_id", "is required"))?;
    let actor = user.actor();

    // Reject outsiders before touching the disk
    let conversation = state.chat_service.conversation(conversation_id, actor).await?;
    if !conversation.is_participant(actor.id) {
        return Err(ApiError::Forbidden(
            "Only participants can post to this conversation".to_string(),
        ));
    }

    let media_ref = match upload {
        Some(upload) => Some(
            state
                .chat_service
                .media()
                .save(&upload.content_type, &upload.bytes)
                .await?,
        ),
        None => None,
    };

    let message = state
        .chat_service
        .post_message(conversation_id, actor, text, media_ref)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::BadRequest(err.body_text())
    }
}
