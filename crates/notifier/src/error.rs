//! Delivery error types and classification of HTTP client failures.

use std::error::Error as _;

use thiserror::Error;

use herald_common::types::DeliveryErrorKind;

/// Longest error text carried into reports.
pub const MAX_ERROR_LEN: usize = 256;

/// A failed delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("HTTP {code}: {body}")]
    Status { code: u16, body: String },

    #[error("request failed: {0}")]
    Request(String),

    /// The request could not be built (e.g. an invalid header); retrying cannot help.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl DeliveryError {
    pub fn kind(&self) -> DeliveryErrorKind {
        match self {
            DeliveryError::Timeout(_) => DeliveryErrorKind::Timeout,
            DeliveryError::Tls(_) => DeliveryErrorKind::Tls,
            DeliveryError::Connection(_) => DeliveryErrorKind::Connection,
            DeliveryError::Status { .. } => DeliveryErrorKind::Status,
            DeliveryError::Request(_) | DeliveryError::InvalidRequest(_) => {
                DeliveryErrorKind::Request
            }
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            DeliveryError::Status { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        !matches!(self, DeliveryError::InvalidRequest(_))
    }

    /// Error text bounded to [`MAX_ERROR_LEN`] characters.
    pub fn summary(&self) -> String {
        truncate(&self.to_string(), MAX_ERROR_LEN)
    }
}

impl From<reqwest::Error> for DeliveryError {
    fn from(err: reqwest::Error) -> Self {
        // Webhook paths carry tokens; only the host is ever reported.
        let err = err.without_url();
        let detail = describe(&err);

        if err.is_timeout() {
            DeliveryError::Timeout(detail)
        } else if is_tls_failure(&err) {
            DeliveryError::Tls(detail)
        } else if err.is_connect() {
            DeliveryError::Connection(detail)
        } else if let Some(status) = err.status() {
            DeliveryError::Status {
                code: status.as_u16(),
                body: String::new(),
            }
        } else if err.is_builder() {
            DeliveryError::InvalidRequest(detail)
        } else {
            DeliveryError::Request(detail)
        }
    }
}

/// Cut `text` to at most `max` characters, marking the cut with `...`.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}

/// The innermost cause is usually the informative one (`certificate has expired`,
/// `Connection refused`), so the whole chain is joined.
fn describe(err: &reqwest::Error) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        let text = cause.to_string();
        if parts.last() != Some(&text) {
            parts.push(text);
        }
        source = cause.source();
    }
    parts.join(": ")
}

fn is_tls_failure(err: &reqwest::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = std::error::Error::source(err);
    while let Some(cause) = source {
        let text = cause.to_string().to_ascii_lowercase();
        if ["certificate", "tls", "ssl", "handshake"]
            .iter()
            .any(|marker| text.contains(marker))
        {
            return true;
        }
        source = cause.source();
    }
    false
}
