//! Liveness and dependency status

use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let (status, storage) = match &state.database {
        Some(db) if db.is_healthy().await => (StatusCode::OK, "postgres"),
        Some(_) => (StatusCode::SERVICE_UNAVAILABLE, "postgres_unreachable"),
        None => (StatusCode::OK, "in_memory"),
    };

    let body = json!({
        "status": if status.is_success() { "ok" } else { "degraded" },
        "version": env!("CARGO_PKG_VERSION"),
        "storage": storage,
        "sessions": state.hub.session_count().await,
    });
    (status, Json(body))
}
