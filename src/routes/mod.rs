//! Route definitions for the MontirKu API

mod auth;
mod booking;
mod catalog;
mod chat;
mod geocoding;
mod workshop;

use std::time::Duration;

use axum::{
    http::{HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

pub use auth::auth_routes;
pub use booking::booking_routes;
pub use catalog::catalog_routes;
pub use chat::chat_routes;
pub use geocoding::geocoding_routes;
pub use workshop::workshop_routes;

use crate::chat::MEDIA_PREFIX;
use crate::config::Config;
use crate::handlers::health::health_check;
use crate::middleware::{rate_limit, request_tracing, with_security_headers, RateLimiter};
use crate::state::AppState;
use crate::websocket::ws_handler;

/// Assemble the full application router
pub fn build_router(state: AppState, config: &Config, rate_limiter: RateLimiter) -> Router {
    let router = Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(ws_handler))
        .merge(auth_routes())
        .merge(booking_routes())
        .merge(catalog_routes())
        .merge(chat_routes(config.max_upload_bytes))
        .merge(workshop_routes())
        .merge(geocoding_routes())
        .nest_service(MEDIA_PREFIX, ServeDir::new(&config.upload_dir))
        .with_state(state)
        .layer(from_fn_with_state(rate_limiter, rate_limit))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.request_timeout_seconds,
        )))
        .layer(configure_cors(config.cors_allowed_origins.as_deref()))
        .layer(from_fn(request_tracing))
        .layer(TraceLayer::new_for_http());

    with_security_headers(router, config.environment.is_production())
}

fn configure_cors(allowed_origins: Option<&str>) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect();

    if origins.is_empty() {
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (permissive)");
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers(Any)
}
