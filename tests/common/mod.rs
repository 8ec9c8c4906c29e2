//! Shared helpers for the HTTP and WebSocket integration tests

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::path::PathBuf;
use tower::ServiceExt;
use uuid::Uuid;

use montirku_server::config::Config;
use montirku_server::middleware::RateLimiter;
use montirku_server::routes::build_router;
use montirku_server::state::AppState;
use montirku_server::store::Stores;

pub fn test_config() -> Config {
    Config {
        bcrypt_cost: 4,
        upload_dir: scratch_dir(),
        max_upload_bytes: 64 * 1024,
        ..Config::default()
    }
}

pub fn scratch_dir() -> PathBuf {
    std::env::temp_dir().join(format!("montirku-test-{}", Uuid::new_v4()))
}

/// Router over fresh in-memory stores
pub fn test_app(config: &Config) -> (Router, AppState) {
    let state = AppState::build(config, Stores::in_memory(), None).unwrap();
    let router = build_router(state.clone(), config, RateLimiter::new(config.rate_limit_rps));
    (router, state)
}

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    into_json(app.clone().oneshot(request).await.unwrap()).await
}

pub async fn into_json(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

/// Sign up and return `(token, account id)`
pub async fn signup(app: &Router, email: &str, role: &str) -> (String, Uuid) {
    let (status, body) = send(
        app,
        Method::POST,
        "/auth/signup",
        None,
        Some(json!({
            "name": "Tester",
            "email": email,
            "password": "rahasia123",
            "role": role,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "signup failed: {}", body);

    let token = body["token"].as_str().unwrap().to_string();
    let id = Uuid::parse_str(body["user"]["id"].as_str().unwrap()).unwrap();
    (token, id)
}

pub fn booking_body(service_type: &str) -> Value {
    json!({
        "service_category": "mechanic",
        "service_type": service_type,
        "vehicle": { "make": "Honda", "model": "Beat", "plate": "B 1234 XYZ" },
        "location": { "latitude": -6.2, "longitude": 106.8, "address": "Jl. Sudirman" },
        "scheduled_at": "2026-11-01T09:00:00Z",
        "description": "Engine will not start",
    })
}

pub async fn create_booking(app: &Router, token: &str, service_type: &str) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/bookings",
        Some(token),
        Some(booking_body(service_type)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {}", body);
    body
}

pub async fn patch_booking(app: &Router, token: &str, id: &str, body: Value) -> (StatusCode, Value) {
    send(
        app,
        Method::PATCH,
        &format!("/bookings/{}", id),
        Some(token),
        Some(body),
    )
    .await
}
