//! MontirKu Backend Library
//!
//! Booking lifecycle, chat and real-time notification services for the
//! MontirKu roadside-assistance marketplace.

pub mod auth;
pub mod booking;
pub mod catalog;
pub mod chat;
pub mod config;
pub mod db;
pub mod error;
pub mod geocoding;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod payment;
pub mod routes;
pub mod state;
pub mod store;
pub mod websocket;
pub mod workshop;
