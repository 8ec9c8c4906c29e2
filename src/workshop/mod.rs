//! Workshop directory

mod model;
mod service;

use thiserror::Error;
use uuid::Uuid;

pub use model::*;
pub use service::WorkshopService;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum WorkshopError {
    #[error("Workshop {0} not found")]
    NotFound(Uuid),

    #[error("{0}")]
    Forbidden(String),

    #[error("Invalid workshop: {0}")]
    Invalid(validator::ValidationErrors),

    #[error(transparent)]
    Store(#[from] StoreError),
}
