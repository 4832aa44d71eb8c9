use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// How the lightweight `*emphasis*` / `\n` message syntax is rendered for a destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkupMode {
    /// `*x*` → `<b>x</b>`, `\n` → `<br>`
    Html,
    /// `*x*` → `**x**`
    Markdown,
    /// Emphasis markers stripped
    Text,
    /// Message passed through unchanged
    #[default]
    Simplified,
}

impl MarkupMode {
    /// The line-break token this mode produces in translated text.
    pub fn line_break(self) -> &'static str {
        match self {
            MarkupMode::Html => "<br>",
            _ => "\n",
        }
    }
}

/// Markup mode name that is not one of `html`, `markdown`, `text`, `simplified`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown markup mode '{0}'")]
pub struct UnknownMarkupMode(pub String);

impl FromStr for MarkupMode {
    type Err = UnknownMarkupMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "html" => Ok(MarkupMode::Html),
            "markdown" => Ok(MarkupMode::Markdown),
            "text" => Ok(MarkupMode::Text),
            "simplified" => Ok(MarkupMode::Simplified),
            _ => Err(UnknownMarkupMode(s.to_string())),
        }
    }
}

impl std::fmt::Display for MarkupMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarkupMode::Html => write!(f, "html"),
            MarkupMode::Markdown => write!(f, "markdown"),
            MarkupMode::Text => write!(f, "text"),
            MarkupMode::Simplified => write!(f, "simplified"),
        }
    }
}

/// One configured delivery target.
///
/// Built fresh from the user's configuration document for every dispatch pass
/// and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Destination {
    /// Platform name as written in the configuration (matched case-insensitively)
    pub platform: String,
    /// Validated absolute http(s) endpoint
    pub webhook_url: Url,
    /// Extra request headers, forwarded verbatim
    pub headers: BTreeMap<String, String>,
    /// Base JSON body; the formatter works on a copy
    pub payload_template: serde_json::Value,
    pub markup_mode: MarkupMode,
    /// Verify the endpoint's TLS certificate (default: true)
    pub verify_tls: bool,
}

impl Destination {
    pub fn new(platform: impl Into<String>, webhook_url: Url) -> Self {
        Self {
            platform: platform.into(),
            webhook_url,
            headers: BTreeMap::new(),
            payload_template: serde_json::Value::Object(serde_json::Map::new()),
            markup_mode: MarkupMode::default(),
            verify_tls: true,
        }
    }

    pub fn with_template(mut self, template: serde_json::Value) -> Self {
        self.payload_template = template;
        self
    }

    pub fn with_markup(mut self, mode: MarkupMode) -> Self {
        self.markup_mode = mode;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Host portion of the webhook URL, safe to log and report.
    ///
    /// Webhook paths and queries frequently embed secrets, so only the host is exposed.
    pub fn endpoint(&self) -> String {
        self.webhook_url.host_str().unwrap_or_default().to_string()
    }
}

/// A single message to be delivered to an ordered set of destinations.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub message: String,
    pub destinations: Vec<Destination>,
}

impl DispatchRequest {
    pub fn new(message: impl Into<String>, destinations: Vec<Destination>) -> Self {
        Self {
            message: message.into(),
            destinations,
        }
    }
}

/// Per-destination delivery state.
///
/// `Pending → Attempting(n) → Delivered | Attempting(n+1) | Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "attempt", rename_all = "snake_case")]
pub enum DeliveryState {
    Pending,
    Attempting(u32),
    Delivered,
    Failed,
}

impl DeliveryState {
    pub fn is_terminal(self) -> bool {
        matches!(self, DeliveryState::Delivered | DeliveryState::Failed)
    }
}

impl std::fmt::Display for DeliveryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryState::Pending => write!(f, "pending"),
            DeliveryState::Attempting(n) => write!(f, "attempting({})", n),
            DeliveryState::Delivered => write!(f, "delivered"),
            DeliveryState::Failed => write!(f, "failed"),
        }
    }
}

/// Category of a failed delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryErrorKind {
    Timeout,
    Tls,
    Connection,
    Status,
    Request,
}

impl std::fmt::Display for DeliveryErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryErrorKind::Timeout => write!(f, "timeout"),
            DeliveryErrorKind::Tls => write!(f, "tls"),
            DeliveryErrorKind::Connection => write!(f, "connection"),
            DeliveryErrorKind::Status => write!(f, "status"),
            DeliveryErrorKind::Request => write!(f, "request"),
        }
    }
}

/// Outcome of delivering to one destination during a dispatch pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationOutcome {
    pub platform: String,
    /// True when the final state is `Delivered`
    pub success: bool,
    /// Webhook host (never the full URL)
    pub endpoint: String,
    pub state: DeliveryState,
    pub attempts: u32,
    /// HTTP status of the last response, if one was received
    pub status_code: Option<u16>,
    pub error_kind: Option<DeliveryErrorKind>,
    /// Truncated description of the last error
    pub error: Option<String>,
}

/// Aggregate result of one dispatch pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchReport {
    pub id: Uuid,
    /// True only when every destination ended `Delivered`
    pub success: bool,
    pub outcomes: Vec<DestinationOutcome>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl DispatchReport {
    pub fn new(
        id: Uuid,
        outcomes: Vec<DestinationOutcome>,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        // An empty pass delivered nothing, so it is not a success.
        let success = !outcomes.is_empty() && outcomes.iter().all(|o| o.success);
        Self {
            id,
            success,
            outcomes,
            started_at,
            finished_at,
        }
    }

    pub fn failed(&self) -> impl Iterator<Item = &DestinationOutcome> {
        self.outcomes.iter().filter(|o| !o.success)
    }

    /// Human-readable one-line summary.
    pub fn summary(&self) -> String {
        let delivered = self.outcomes.iter().filter(|o| o.success).count();
        let total = self.outcomes.len();
        if self.success {
            return format!("Delivered to {}/{} destinations", delivered, total);
        }

        let failed: Vec<String> = self
            .failed()
            .map(|o| match (&o.error_kind, o.status_code) {
                (_, Some(code)) => format!("{} (HTTP {})", o.platform, code),
                (Some(kind), None) => format!("{} ({})", o.platform, kind),
                (None, None) => o.platform.clone(),
            })
            .collect();
        format!(
            "Delivered to {}/{} destinations; failed: {}",
            delivered,
            total,
            failed.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(platform: &str, state: DeliveryState) -> DestinationOutcome {
        DestinationOutcome {
            platform: platform.to_string(),
            success: state == DeliveryState::Delivered,
            endpoint: "example.com".to_string(),
            state,
            attempts: 1,
            status_code: None,
            error_kind: None,
            error: None,
        }
    }

    #[test]
    fn test_markup_mode_parse_is_case_insensitive() {
        assert_eq!("HTML".parse::<MarkupMode>().unwrap(), MarkupMode::Html);
        assert_eq!(" markdown ".parse::<MarkupMode>().unwrap(), MarkupMode::Markdown);
        assert_eq!(
            "bbcode".parse::<MarkupMode>().unwrap_err(),
            UnknownMarkupMode("bbcode".to_string())
        );
    }

    #[test]
    fn test_report_success_requires_all_delivered() {
        let now = Utc::now();
        let ok = DispatchReport::new(
            Uuid::new_v4(),
            vec![
                outcome("discord", DeliveryState::Delivered),
                outcome("slack", DeliveryState::Delivered),
            ],
            now,
            now,
        );
        assert!(ok.success);
        assert_eq!(ok.summary(), "Delivered to 2/2 destinations");

        let mut failed = outcome("slack", DeliveryState::Failed);
        failed.status_code = Some(404);
        let partial = DispatchReport::new(
            Uuid::new_v4(),
            vec![outcome("discord", DeliveryState::Delivered), failed],
            now,
            now,
        );
        assert!(!partial.success);
        assert_eq!(
            partial.summary(),
            "Delivered to 1/2 destinations; failed: slack (HTTP 404)"
        );
    }

    #[test]
    fn test_empty_report_is_not_success() {
        let now = Utc::now();
        let report = DispatchReport::new(Uuid::new_v4(), vec![], now, now);
        assert!(!report.success);
    }

    #[test]
    fn test_delivery_state_serialization() {
        let json = serde_json::to_value(DeliveryState::Attempting(2)).unwrap();
        assert_eq!(json, serde_json::json!({"state": "attempting", "attempt": 2}));
        let json = serde_json::to_value(DeliveryState::Delivered).unwrap();
        assert_eq!(json, serde_json::json!({"state": "delivered"}));
    }
}
