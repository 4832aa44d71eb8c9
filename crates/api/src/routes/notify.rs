//! Notification routes.
//!
//! Every call carries its own configuration document; destinations are built
//! for that call only and dropped once the dispatch pass completes.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use herald_common::destination::parse_config;
use herald_common::error::AppError;
use herald_common::types::{DispatchReport, DispatchRequest};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/test-notification", post(test_notification))
        .route("/notify", post(notify))
        .route("/notify/once", post(notify_once))
}

/// Request body for `/test-notification`.
#[derive(Debug, Deserialize)]
pub struct TestNotificationRequest {
    /// Configuration document, as an object or a JSON string
    pub config: Option<Value>,
}

/// Request body for `/notify` and `/notify/once`.
#[derive(Debug, Deserialize)]
pub struct NotifyRequest {
    pub config: Option<Value>,
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NotifyResponse {
    pub success: bool,
    pub message: String,
    /// Platforms that received the message
    pub platforms: Vec<String>,
    pub status_code: u16,
    /// Configuration entries that were skipped
    pub rejected: Vec<String>,
    pub report: DispatchReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Retry,
    Once,
}

/// POST /test-notification: Send the configured test message.
async fn test_notification(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<NotifyResponse>), AppError> {
    let req: TestNotificationRequest = parse_body(&body)?;
    let message = state.config.test_message.clone();
    send(&state, req.config, message, Mode::Retry, "Test notification").await
}

/// POST /notify: Send a message with retries.
async fn notify(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<NotifyResponse>), AppError> {
    let req: NotifyRequest = parse_body(&body)?;
    let message = required_message(req.message)?;
    send(&state, req.config, message, Mode::Retry, "Notification").await
}

/// POST /notify/once: Send a message with one attempt per destination.
async fn notify_once(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<NotifyResponse>), AppError> {
    let req: NotifyRequest = parse_body(&body)?;
    let message = required_message(req.message)?;
    send(&state, req.config, message, Mode::Once, "Notification").await
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &Bytes) -> Result<T, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::Validation("Missing request body".to_string()));
    }
    serde_json::from_slice(body).map_err(|e| {
        tracing::warn!(error = %e, "Rejected malformed request body");
        AppError::Validation("Invalid JSON format".to_string())
    })
}

fn required_message(message: Option<String>) -> Result<String, AppError> {
    match message {
        Some(m) if !m.trim().is_empty() => Ok(m),
        _ => Err(AppError::Validation("Missing message".to_string())),
    }
}

async fn send(
    state: &AppState,
    config: Option<Value>,
    message: String,
    mode: Mode,
    label: &str,
) -> Result<(StatusCode, Json<NotifyResponse>), AppError> {
    let config = match config {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(other) => Some(other),
    }
    .ok_or_else(|| AppError::Validation("Missing configuration".to_string()))?;

    let parsed = parse_config(&config)?;

    if parsed.enabled_platforms.is_empty() {
        return Err(AppError::Validation(
            "No enabled platforms found in configuration".to_string(),
        ));
    }

    let rejected: Vec<String> = parsed.errors.iter().map(ToString::to_string).collect();
    if parsed.destinations.is_empty() {
        return Err(AppError::Validation(format!(
            "No valid destinations: {}",
            rejected.join("; ")
        )));
    }

    tracing::info!(
        platforms = %parsed.enabled_platforms.join(", "),
        destinations = parsed.destinations.len(),
        rejected = rejected.len(),
        "Configuration OK, sending notification"
    );

    let request = DispatchRequest::new(message, parsed.destinations);
    let report = match mode {
        Mode::Retry => state.dispatcher.dispatch(&request).await,
        Mode::Once => state.single.dispatch_once(&request).await,
    };

    let mut platforms: Vec<String> = Vec::new();
    for outcome in report.outcomes.iter().filter(|o| o.success) {
        if !platforms.contains(&outcome.platform) {
            platforms.push(outcome.platform.clone());
        }
    }

    let (status, message) = if report.success {
        (
            StatusCode::OK,
            format!("{} sent to {}", label, platforms.join(", ")),
        )
    } else {
        (StatusCode::BAD_GATEWAY, report.summary())
    };

    Ok((
        status,
        Json(NotifyResponse {
            success: report.success,
            message,
            platforms,
            status_code: status.as_u16(),
            rejected,
            report,
        }),
    ))
}
