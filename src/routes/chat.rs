//! Conversation and message routes

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::handlers::chat::*;
use crate::state::AppState;

/// Multipart overhead allowed on top of the attachment itself
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn chat_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/conversations", post(create_conversation))
        .route(
            "/conversations/booking/:booking_id",
            get(get_conversation_by_booking),
        )
        .route("/messages/:conversation_id", get(list_messages))
        .route(
            "/messages",
            post(post_message).layer(DefaultBodyLimit::max(
                max_upload_bytes.saturating_add(FORM_OVERHEAD_BYTES),
            )),
        )
}
