//! API handlers for the MontirKu backend

pub mod auth;
pub mod booking;
pub mod catalog;
pub mod chat;
pub mod geocoding;
pub mod health;
pub mod workshop;

pub use crate::middleware::auth::AuthenticatedUser;
