//! Application state shared across handlers

use chrono::Utc;
use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::AuthService;
use crate::booking::{pricing, BookingService};
use crate::catalog::Catalog;
use crate::chat::{ChatService, MediaStore};
use crate::config::Config;
use crate::db::Database;
use crate::geocoding::{GeocodingClient, GeocodingError};
use crate::payment::MockPaymentGateway;
use crate::store::Stores;
use crate::websocket::{Hub, WsState};
use crate::workshop::WorkshopService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub booking_service: Arc<BookingService>,
    pub chat_service: Arc<ChatService>,
    pub workshop_service: Arc<WorkshopService>,
    pub catalog: Arc<Catalog>,
    pub geocoding: GeocodingClient,
    pub hub: Hub,
    /// Absent when running on the in-memory stores
    pub database: Option<Database>,
}

impl AppState {
    /// Wire every service onto `stores`
    pub fn build(
        config: &Config,
        stores: Stores,
        database: Option<Database>,
    ) -> Result<Self, GeocodingError> {
        let hub = Hub::new(config.ws_channel_capacity);
        let events = Arc::new(hub.clone());

        let auth_service = Arc::new(AuthService::new(
            stores.accounts.clone(),
            config.jwt_secret.clone(),
            config.jwt_ttl_seconds,
            config.bcrypt_cost,
        ));
        let booking_service = Arc::new(BookingService::new(
            stores.bookings.clone(),
            events.clone(),
            pricing::from_mode(config.pricing),
            Arc::new(MockPaymentGateway),
        ));
        let chat_service = Arc::new(ChatService::new(
            stores.conversations.clone(),
            stores.bookings.clone(),
            events,
            MediaStore::new(config.upload_dir.clone(), config.max_upload_bytes),
        ));
        let workshop_service = Arc::new(WorkshopService::new(stores.workshops.clone()));

        Ok(Self {
            auth_service,
            booking_service,
            chat_service,
            workshop_service,
            catalog: Arc::new(Catalog::seeded(Utc::now())),
            geocoding: GeocodingClient::new(config.geocoding_url.clone())?,
            hub,
            database,
        })
    }
}

impl FromRef<AppState> for WsState {
    fn from_ref(app_state: &AppState) -> Self {
        WsState {
            hub: app_state.hub.clone(),
            auth_service: app_state.auth_service.clone(),
            chat_service: app_state.chat_service.clone(),
        }
    }
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.auth_service.clone()
    }
}

impl FromRef<AppState> for Arc<BookingService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.booking_service.clone()
    }
}

impl FromRef<AppState> for Arc<ChatService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.chat_service.clone()
    }
}

impl FromRef<AppState> for Arc<WorkshopService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.workshop_service.clone()
    }
}

impl FromRef<AppState> for Arc<Catalog> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.catalog.clone()
    }
}

impl FromRef<AppState> for GeocodingClient {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.geocoding.clone()
    }
}
