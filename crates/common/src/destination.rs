//! Configuration document parsing.
//!
//! Users author a JSON document keyed by platform name:
//!
//! ```json
//! {
//!   "Telegram": {
//!     "ENABLED": true,
//!     "WEBHOOK_URL": "https://api.telegram.org/bot<token>/sendMessage",
//!     "HEADER": {"Content-Type": "application/json"},
//!     "PAYLOAD": {"chat_id": "123"},
//!     "FORMAT_MESSAGE": "markdown"
//!   }
//! }
//! ```
//!
//! Field names are matched case-insensitively. `WEBHOOK_URL` may be a list, in
//! which case `HEADER`, `PAYLOAD` and `FORMAT_MESSAGE` may be lists of the same
//! length or single values shared by every URL. Each URL becomes one
//! [`Destination`]; invalid entries are reported as [`ConfigError`]s and skipped.

use std::collections::BTreeMap;

use reqwest::Url;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::types::{Destination, MarkupMode};

/// A destination (or the whole document) that cannot be dispatched to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid configuration document: {0}")]
    InvalidDocument(String),

    #[error("settings for platform '{platform}' must be an object")]
    InvalidSettings { platform: String },

    #[error("platform '{platform}' has no webhook URL")]
    MissingWebhookUrl { platform: String },

    #[error("platform '{platform}' has an invalid webhook URL '{url}'")]
    InvalidWebhookUrl { platform: String, url: String },

    #[error("platform '{platform}' has an unparseable payload template: {reason}")]
    InvalidTemplate { platform: String, reason: String },

    #[error("platform '{platform}' has invalid headers: {reason}")]
    InvalidHeaders { platform: String, reason: String },
}

/// Result of parsing a configuration document.
#[derive(Debug, Clone, Default)]
pub struct ParsedConfig {
    /// Platforms with `ENABLED: true`, in document order
    pub enabled_platforms: Vec<String>,
    /// Destinations ready for dispatch, in document order
    pub destinations: Vec<Destination>,
    /// Entries that were rejected and will not be attempted
    pub errors: Vec<ConfigError>,
}

/// Parse a configuration document into destinations.
///
/// The document may be a JSON object or a string containing one (the web form
/// posts it stringified). Only a document that is not an object at all fails
/// outright; per-platform problems are collected in [`ParsedConfig::errors`].
pub fn parse_config(document: &Value) -> Result<ParsedConfig, ConfigError> {
    let owned;
    let root = match document {
        Value::String(raw) => {
            owned = serde_json::from_str::<Value>(raw.trim())
                .map_err(|e| ConfigError::InvalidDocument(e.to_string()))?;
            &owned
        }
        other => other,
    };

    let platforms = root
        .as_object()
        .ok_or_else(|| ConfigError::InvalidDocument("expected a JSON object".to_string()))?;

    let mut parsed = ParsedConfig::default();

    for (platform, settings) in platforms {
        let Some(settings) = settings.as_object() else {
            tracing::warn!(platform = %platform, "Invalid settings format for platform");
            parsed.errors.push(ConfigError::InvalidSettings {
                platform: platform.clone(),
            });
            continue;
        };

        if !field(settings, "enabled").and_then(Value::as_bool).unwrap_or(false) {
            continue;
        }
        parsed.enabled_platforms.push(platform.clone());

        let urls = as_list(field(settings, "webhook_url"));
        if urls.is_empty() {
            tracing::warn!(platform = %platform, "Platform enabled without a webhook URL");
            parsed.errors.push(ConfigError::MissingWebhookUrl {
                platform: platform.clone(),
            });
            continue;
        }

        let headers = as_list(field(settings, "header"));
        let payloads = as_list(field(settings, "payload"));
        let formats = as_list(field(settings, "format_message"));
        let verify_tls = field(settings, "verify_tls")
            .and_then(Value::as_bool)
            .unwrap_or(true);

        for (index, url) in urls.iter().enumerate() {
            match build_destination(
                platform,
                url,
                pick(&headers, index),
                pick(&payloads, index),
                pick(&formats, index),
                verify_tls,
            ) {
                Ok(destination) => {
                    tracing::info!(
                        platform = %platform,
                        endpoint = %destination.endpoint(),
                        markup = %destination.markup_mode,
                        "Destination configured"
                    );
                    parsed.destinations.push(destination);
                }
                Err(err) => {
                    tracing::warn!(platform = %platform, error = %err, "Destination rejected");
                    parsed.errors.push(err);
                }
            }
        }
    }

    Ok(parsed)
}

/// Clean and validate a webhook URL.
///
/// Strips whitespace, surrounding quotes and stray backslashes (artifacts of
/// copy-pasting from escaped JSON), then requires an absolute http(s) URL with
/// a host. Returns `None` for anything else.
pub fn clean_url(raw: &str) -> Option<Url> {
    let cleaned: String = raw
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'')
        .chars()
        .filter(|c| *c != '\\')
        .collect();

    if !(cleaned.starts_with("http://") || cleaned.starts_with("https://")) {
        return None;
    }

    let url = Url::parse(&cleaned).ok()?;
    url.host_str()?;
    Some(url)
}

fn build_destination(
    platform: &str,
    url: &Value,
    headers: Option<&Value>,
    payload: Option<&Value>,
    format: Option<&Value>,
    verify_tls: bool,
) -> Result<Destination, ConfigError> {
    let raw_url = url.as_str().unwrap_or_default();
    let webhook_url = clean_url(raw_url).ok_or_else(|| ConfigError::InvalidWebhookUrl {
        platform: platform.to_string(),
        url: match url {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        },
    })?;

    Ok(Destination {
        platform: platform.to_string(),
        webhook_url,
        headers: parse_headers(platform, headers)?,
        payload_template: parse_template(platform, payload)?,
        markup_mode: parse_markup(platform, format),
        verify_tls,
    })
}

fn parse_headers(
    platform: &str,
    value: Option<&Value>,
) -> Result<BTreeMap<String, String>, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidHeaders {
        platform: platform.to_string(),
        reason,
    };

    let parsed;
    let object = match value {
        None | Some(Value::Null) => return Ok(BTreeMap::new()),
        Some(Value::String(raw)) if raw.trim().is_empty() => return Ok(BTreeMap::new()),
        Some(Value::String(raw)) => {
            parsed = serde_json::from_str::<Value>(raw).map_err(|e| invalid(e.to_string()))?;
            parsed
                .as_object()
                .ok_or_else(|| invalid("expected a JSON object".to_string()))?
        }
        Some(Value::Object(map)) => map,
        Some(_) => return Err(invalid("expected a JSON object".to_string())),
    };

    Ok(object
        .iter()
        .map(|(name, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (name.clone(), value)
        })
        .collect())
}

/// Templates that are JSON strings are parsed here; non-object structures are
/// kept as-is and left for the formatter to reject.
fn parse_template(platform: &str, value: Option<&Value>) -> Result<Value, ConfigError> {
    match value {
        None | Some(Value::Null) => Ok(Value::Object(Map::new())),
        Some(Value::String(raw)) if raw.trim().is_empty() => Ok(Value::Object(Map::new())),
        Some(Value::String(raw)) => {
            serde_json::from_str(raw.trim()).map_err(|e| ConfigError::InvalidTemplate {
                platform: platform.to_string(),
                reason: e.to_string(),
            })
        }
        Some(other) => Ok(other.clone()),
    }
}

fn parse_markup(platform: &str, value: Option<&Value>) -> MarkupMode {
    let Some(name) = value.and_then(Value::as_str) else {
        return MarkupMode::default();
    };

    name.parse().unwrap_or_else(|err| {
        tracing::warn!(
            platform = %platform,
            error = %err,
            "Falling back to simplified markup, message will be sent unchanged"
        );
        MarkupMode::Simplified
    })
}

fn field<'a>(settings: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    settings
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value)
}

fn as_list(value: Option<&Value>) -> Vec<&Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(single) => vec![single],
    }
}

/// Entry `index` of a per-URL list, or the shared value when only one is given.
fn pick<'a>(values: &[&'a Value], index: usize) -> Option<&'a Value> {
    match values.len() {
        0 => None,
        1 => Some(values[0]),
        _ => values.get(index).copied(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clean_url_strips_artifacts() {
        let url = clean_url("  \"https://hooks.slack.com/services/T0\\/B0\"  ").unwrap();
        assert_eq!(url.as_str(), "https://hooks.slack.com/services/T0/B0");
    }

    #[test]
    fn test_clean_url_rejects_non_http() {
        assert!(clean_url("not-a-url").is_none());
        assert!(clean_url("ftp://example.com/hook").is_none());
        assert!(clean_url("").is_none());
        assert!(clean_url("https://").is_none());
    }

    #[test]
    fn test_disabled_platforms_are_ignored() {
        let doc = json!({
            "Discord": {"ENABLED": false, "WEBHOOK_URL": "https://discord.com/api/webhooks/1"},
            "Slack": {"WEBHOOK_URL": "https://hooks.slack.com/services/x"}
        });
        let parsed = parse_config(&doc).unwrap();
        assert!(parsed.enabled_platforms.is_empty());
        assert!(parsed.destinations.is_empty());
        assert!(parsed.errors.is_empty());
    }

    #[test]
    fn test_full_destination() {
        let doc = json!({
            "Telegram": {
                "ENABLED": true,
                "WEBHOOK_URL": "https://api.telegram.org/bot1/sendMessage",
                "HEADER": {"Content-Type": "application/json", "X-Retry": 3},
                "PAYLOAD": {"chat_id": "123"},
                "FORMAT_MESSAGE": "markdown"
            }
        });
        let parsed = parse_config(&doc).unwrap();
        assert_eq!(parsed.enabled_platforms, vec!["Telegram"]);
        assert_eq!(parsed.destinations.len(), 1);

        let dest = &parsed.destinations[0];
        assert_eq!(dest.platform, "Telegram");
        assert_eq!(dest.endpoint(), "api.telegram.org");
        assert_eq!(dest.headers["Content-Type"], "application/json");
        assert_eq!(dest.headers["X-Retry"], "3");
        assert_eq!(dest.payload_template, json!({"chat_id": "123"}));
        assert_eq!(dest.markup_mode, MarkupMode::Markdown);
        assert!(dest.verify_tls);
    }

    #[test]
    fn test_field_names_are_case_insensitive() {
        let doc = json!({
            "Gotify": {
                "enabled": true,
                "Webhook_Url": "https://gotify.example.com/message",
                "format_message": "text",
                "verify_tls": false
            }
        });
        let parsed = parse_config(&doc).unwrap();
        let dest = &parsed.destinations[0];
        assert_eq!(dest.markup_mode, MarkupMode::Text);
        assert!(!dest.verify_tls);
    }

    #[test]
    fn test_list_values_expand_and_broadcast() {
        let doc = json!({
            "Discord": {
                "ENABLED": true,
                "WEBHOOK_URL": [
                    "https://discord.com/api/webhooks/1",
                    "https://discord.com/api/webhooks/2"
                ],
                "PAYLOAD": [{"username": "a"}, {"username": "b"}],
                "FORMAT_MESSAGE": "markdown"
            }
        });
        let parsed = parse_config(&doc).unwrap();
        assert_eq!(parsed.destinations.len(), 2);
        assert_eq!(parsed.destinations[0].payload_template, json!({"username": "a"}));
        assert_eq!(parsed.destinations[1].payload_template, json!({"username": "b"}));
        assert!(
            parsed
                .destinations
                .iter()
                .all(|d| d.markup_mode == MarkupMode::Markdown)
        );
    }

    #[test]
    fn test_invalid_url_is_rejected_without_dropping_others() {
        let doc = json!({
            "Slack": {"ENABLED": true, "WEBHOOK_URL": "not-a-url"},
            "Discord": {"ENABLED": true, "WEBHOOK_URL": "https://discord.com/api/webhooks/1"}
        });
        let parsed = parse_config(&doc).unwrap();
        assert_eq!(parsed.enabled_platforms, vec!["Slack", "Discord"]);
        assert_eq!(parsed.destinations.len(), 1);
        assert_eq!(parsed.destinations[0].platform, "Discord");
        assert_eq!(
            parsed.errors,
            vec![ConfigError::InvalidWebhookUrl {
                platform: "Slack".to_string(),
                url: "not-a-url".to_string()
            }]
        );
    }

    #[test]
    fn test_missing_webhook_url() {
        let doc = json!({"Matrix": {"ENABLED": true, "PAYLOAD": {}}});
        let parsed = parse_config(&doc).unwrap();
        assert!(parsed.destinations.is_empty());
        assert_eq!(
            parsed.errors,
            vec![ConfigError::MissingWebhookUrl {
                platform: "Matrix".to_string()
            }]
        );
    }

    #[test]
    fn test_stringified_document_and_template() {
        let doc = Value::String(
            json!({
                "Ntfy": {
                    "ENABLED": true,
                    "WEBHOOK_URL": "https://ntfy.sh/alerts",
                    "PAYLOAD": r#"{"data": ""}"#
                }
            })
            .to_string(),
        );
        let parsed = parse_config(&doc).unwrap();
        assert_eq!(parsed.destinations[0].payload_template, json!({"data": ""}));
    }

    #[test]
    fn test_unparseable_template_is_rejected() {
        let doc = json!({
            "Slack": {
                "ENABLED": true,
                "WEBHOOK_URL": "https://hooks.slack.com/services/x",
                "PAYLOAD": "{not json"
            }
        });
        let parsed = parse_config(&doc).unwrap();
        assert!(parsed.destinations.is_empty());
        assert!(matches!(parsed.errors[0], ConfigError::InvalidTemplate { .. }));
    }

    #[test]
    fn test_unknown_markup_falls_back_to_simplified() {
        let doc = json!({
            "Slack": {
                "ENABLED": true,
                "WEBHOOK_URL": "https://hooks.slack.com/services/x",
                "FORMAT_MESSAGE": "bbcode"
            }
        });
        let parsed = parse_config(&doc).unwrap();
        assert_eq!(parsed.destinations[0].markup_mode, MarkupMode::Simplified);
    }

    #[test]
    fn test_non_object_document_fails() {
        assert!(matches!(
            parse_config(&json!([1, 2])),
            Err(ConfigError::InvalidDocument(_))
        ));
        assert!(matches!(
            parse_config(&Value::String("{oops".to_string())),
            Err(ConfigError::InvalidDocument(_))
        ));
    }

    #[test]
    fn test_non_object_settings_reported() {
        let parsed = parse_config(&json!({"Slack": "yes"})).unwrap();
        assert_eq!(
            parsed.errors,
            vec![ConfigError::InvalidSettings {
                platform: "Slack".to_string()
            }]
        );
    }
}
