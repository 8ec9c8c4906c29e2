//! Conversation relay between a booking's customer and mechanic

mod media;
mod model;
mod service;

use thiserror::Error;

pub use media::{MediaStore, PUBLIC_PREFIX as MEDIA_PREFIX};
pub use model::*;
pub use service::ChatService;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Attachment exceeds {0} bytes")]
    TooLarge(usize),

    #[error("Failed to store attachment: {0}")]
    Media(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
