//! Payload formatter.
//!
//! Turns a message plus a destination's payload template into the exact
//! request body its platform expects:
//! 1. Translate the message markup (`*bold*`, `\n`) for the destination's mode
//! 2. Handle the generic `title` / `extras` / `data` template keys
//! 3. Substitute the message into the platform's body field(s)
//!
//! Templates are never modified in place; every call works on its own copy.

pub mod markup;
pub mod platform;

use serde_json::{Map, Value, json};
use thiserror::Error;

use herald_common::types::{Destination, MarkupMode};

pub use platform::{Encoding, Platform};

/// Errors raised while formatting. Callers of [`format`] never see these;
/// they are logged and the message is sent unformatted instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatterError {
    #[error("payload template must be a JSON object, got {0}")]
    MalformedTemplate(&'static str),
}

/// Final request body for one destination.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    /// Sent as raw UTF-8 bytes, no JSON envelope
    Raw(String),
}

impl Payload {
    pub fn is_raw(&self) -> bool {
        matches!(self, Payload::Raw(_))
    }
}

/// Format `message` for `destination`.
///
/// Falls back to `{"message": <message>}` if the template is unusable.
pub fn format(destination: &Destination, message: &str) -> Payload {
    match try_format(
        &destination.platform,
        &destination.payload_template,
        message,
        destination.markup_mode,
    ) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::warn!(
                platform = %destination.platform,
                error = %err,
                "Formatting failed, sending message unmodified"
            );
            Payload::Json(json!({ "message": message }))
        }
    }
}

/// Format `message` for a platform and template.
pub fn try_format(
    platform: &str,
    template: &Value,
    message: &str,
    mode: MarkupMode,
) -> Result<Payload, FormatterError> {
    let mut payload = match template {
        Value::Object(map) => map.clone(),
        Value::Null => Map::new(),
        Value::Array(_) => return Err(FormatterError::MalformedTemplate("an array")),
        Value::String(_) => return Err(FormatterError::MalformedTemplate("a string")),
        Value::Number(_) => return Err(FormatterError::MalformedTemplate("a number")),
        Value::Bool(_) => return Err(FormatterError::MalformedTemplate("a boolean")),
    };

    let translated = markup::translate(message, mode);
    let (body, raw) = apply_template_keys(&mut payload, translated, mode);

    let platform = Platform::identify(platform);
    let encoding = platform.apply(&mut payload, &body, mode);

    tracing::debug!(platform = %platform, mode = %mode, raw, "Formatted payload");

    if raw || encoding == Encoding::Raw {
        Ok(Payload::Raw(body))
    } else {
        Ok(Payload::Json(Value::Object(payload)))
    }
}

/// Handle the keys any template may carry regardless of platform.
///
/// - `title`: the text before the first line break becomes the title
///   (emphasis stripped) and the rest becomes the body
/// - `extras`: newlines are doubled and the body is written to `message`
/// - `data`: the body is sent as raw bytes
///
/// Returns the body to substitute and whether raw delivery was requested.
fn apply_template_keys(
    payload: &mut Map<String, Value>,
    mut body: String,
    mode: MarkupMode,
) -> (String, bool) {
    if payload.contains_key("title") {
        let delimiter = mode.line_break();
        if let Some((title, rest)) = body.split_once(delimiter) {
            payload.insert("title".into(), Value::String(markup::strip_emphasis(title)));
            body = rest.to_string();
        }
    }

    if payload.contains_key("extras") {
        body = body.replace('\n', "\n\n");
        payload.insert("message".into(), Value::String(body.clone()));
    }

    let raw = payload.contains_key("data");
    if raw {
        payload.insert("data".into(), Value::String(body.clone()));
    }

    (body, raw)
}
