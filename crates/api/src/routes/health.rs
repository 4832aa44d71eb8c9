//! Liveness endpoint, also reporting the active delivery policy.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "herald-api",
        "version": env!("CARGO_PKG_VERSION"),
        "delivery": {
            "max_attempts": state.dispatcher.policy().max_attempts,
            "connect_timeout_secs": state.config.connect_timeout_secs,
            "read_timeout_secs": state.config.read_timeout_secs,
        }
    }))
}
