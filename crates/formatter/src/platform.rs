//! Known platforms and the body fields each one expects.

use serde_json::{Map, Value};

use herald_common::types::MarkupMode;

use crate::markup;

/// Keys searched, in order, when a platform is not recognized.
pub const GENERIC_MESSAGE_KEYS: [&str; 4] = ["message", "text", "content", "body"];

/// How the formatted body must go over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Json,
    /// Plain UTF-8 request body, no JSON envelope
    Raw,
}

/// Supported chat and push platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Telegram,
    Discord,
    Slack,
    Mattermost,
    RocketChat,
    Pumble,
    Flock,
    GoogleChat,
    Teams,
    Zulip,
    Matrix,
    Gotify,
    Pushover,
    Pushbullet,
    Ntfy,
    Apprise,
    /// Anything else: key search over [`GENERIC_MESSAGE_KEYS`]
    Generic,
}

impl Platform {
    /// Identify a platform from a user-supplied name.
    ///
    /// Case and punctuation are ignored, so `Rocket.Chat`, `ROCKET_CHAT` and
    /// `rocketchat` all resolve to [`Platform::RocketChat`].
    pub fn identify(name: &str) -> Self {
        let normalized: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match normalized.as_str() {
            "telegram" => Platform::Telegram,
            "discord" => Platform::Discord,
            "slack" => Platform::Slack,
            "mattermost" => Platform::Mattermost,
            "rocketchat" => Platform::RocketChat,
            "pumble" => Platform::Pumble,
            "flock" => Platform::Flock,
            "googlechat" | "gchat" => Platform::GoogleChat,
            "teams" | "msteams" | "microsoftteams" => Platform::Teams,
            "zulip" => Platform::Zulip,
            "matrix" => Platform::Matrix,
            "gotify" => Platform::Gotify,
            "pushover" => Platform::Pushover,
            "pushbullet" => Platform::Pushbullet,
            "ntfy" => Platform::Ntfy,
            "apprise" => Platform::Apprise,
            _ => Platform::Generic,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Platform::Telegram => "telegram",
            Platform::Discord => "discord",
            Platform::Slack => "slack",
            Platform::Mattermost => "mattermost",
            Platform::RocketChat => "rocketchat",
            Platform::Pumble => "pumble",
            Platform::Flock => "flock",
            Platform::GoogleChat => "googlechat",
            Platform::Teams => "teams",
            Platform::Zulip => "zulip",
            Platform::Matrix => "matrix",
            Platform::Gotify => "gotify",
            Platform::Pushover => "pushover",
            Platform::Pushbullet => "pushbullet",
            Platform::Ntfy => "ntfy",
            Platform::Apprise => "apprise",
            Platform::Generic => "generic",
        }
    }

    /// Write `message` into `payload` following this platform's conventions.
    ///
    /// `message` is already markup-translated for `mode`.
    pub fn apply(
        self,
        payload: &mut Map<String, Value>,
        message: &str,
        mode: MarkupMode,
    ) -> Encoding {
        let text = || Value::String(message.to_string());

        match self {
            Platform::Telegram => {
                payload.insert("text".into(), text());
                let parse_mode = match mode {
                    MarkupMode::Html => "HTML",
                    _ => "Markdown",
                };
                set_default(payload, "parse_mode", parse_mode);
            }
            Platform::Discord => {
                payload.insert("content".into(), text());
            }
            Platform::Slack
            | Platform::Mattermost
            | Platform::RocketChat
            | Platform::Pumble
            | Platform::Flock
            | Platform::GoogleChat
            | Platform::Teams => {
                payload.insert("text".into(), text());
            }
            Platform::Zulip => {
                payload.insert("content".into(), text());
                set_default(payload, "type", "stream");
            }
            Platform::Matrix => {
                payload.insert("body".into(), Value::String(markup::to_plain(message)));
                payload.insert("formatted_body".into(), text());
                set_default(payload, "msgtype", "m.text");
                if mode == MarkupMode::Html {
                    set_default(payload, "format", "org.matrix.custom.html");
                }
            }
            Platform::Gotify | Platform::Pushover => {
                payload.insert("message".into(), text());
            }
            Platform::Pushbullet => {
                payload.insert("body".into(), text());
                set_default(payload, "type", "note");
            }
            Platform::Ntfy => {
                // ntfy only accepts JSON when published with an explicit topic.
                if !payload.contains_key("topic") {
                    return Encoding::Raw;
                }
                payload.insert("message".into(), text());
            }
            Platform::Apprise => {
                payload.insert("body".into(), text());
                let format = match mode {
                    MarkupMode::Html => Some("html"),
                    MarkupMode::Markdown => Some("markdown"),
                    MarkupMode::Text => Some("text"),
                    MarkupMode::Simplified => None,
                };
                if let Some(format) = format {
                    set_default(payload, "format", format);
                }
            }
            Platform::Generic => {
                let key = GENERIC_MESSAGE_KEYS
                    .iter()
                    .find(|key| payload.contains_key(**key))
                    .copied()
                    .unwrap_or("message");
                payload.insert(key.into(), text());
            }
        }

        Encoding::Json
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Set `key` unless the template already carries a non-empty value for it.
fn set_default(payload: &mut Map<String, Value>, key: &str, value: &str) {
    let missing = match payload.get(key) {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    };
    if missing {
        payload.insert(key.into(), Value::String(value.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn apply(platform: Platform, template: Value, message: &str, mode: MarkupMode) -> Value {
        let mut map = template.as_object().cloned().unwrap();
        platform.apply(&mut map, message, mode);
        Value::Object(map)
    }

    #[test]
    fn test_identify_ignores_case_and_punctuation() {
        assert_eq!(Platform::identify("TELEGRAM"), Platform::Telegram);
        assert_eq!(Platform::identify("Rocket.Chat"), Platform::RocketChat);
        assert_eq!(Platform::identify("rocket_chat"), Platform::RocketChat);
        assert_eq!(Platform::identify("Google Chat"), Platform::GoogleChat);
        assert_eq!(Platform::identify("my-homegrown-hook"), Platform::Generic);
    }

    #[test]
    fn test_telegram_adds_parse_mode() {
        let body = apply(
            Platform::Telegram,
            json!({"chat_id": "123"}),
            "Test",
            MarkupMode::Simplified,
        );
        assert_eq!(
            body,
            json!({"chat_id": "123", "text": "Test", "parse_mode": "Markdown"})
        );
    }

    #[test]
    fn test_telegram_html_and_explicit_parse_mode() {
        let body = apply(Platform::Telegram, json!({}), "<b>x</b>", MarkupMode::Html);
        assert_eq!(body["parse_mode"], "HTML");

        let body = apply(
            Platform::Telegram,
            json!({"parse_mode": "MarkdownV2"}),
            "x",
            MarkupMode::Markdown,
        );
        assert_eq!(body["parse_mode"], "MarkdownV2");
    }

    #[test]
    fn test_discord_uses_content() {
        let body = apply(
            Platform::Discord,
            json!({"username": "herald"}),
            "hi",
            MarkupMode::Markdown,
        );
        assert_eq!(body, json!({"username": "herald", "content": "hi"}));
    }

    #[test]
    fn test_slack_family_uses_text() {
        for platform in [
            Platform::Slack,
            Platform::Mattermost,
            Platform::RocketChat,
            Platform::Pumble,
            Platform::Flock,
            Platform::GoogleChat,
            Platform::Teams,
        ] {
            let body = apply(platform, json!({}), "hi", MarkupMode::Text);
            assert_eq!(body, json!({"text": "hi"}), "platform {}", platform);
        }
    }

    #[test]
    fn test_zulip_defaults_to_stream() {
        let body = apply(Platform::Zulip, json!({"to": "alerts"}), "hi", MarkupMode::Markdown);
        assert_eq!(body, json!({"to": "alerts", "content": "hi", "type": "stream"}));

        let body = apply(Platform::Zulip, json!({"type": "private"}), "hi", MarkupMode::Markdown);
        assert_eq!(body["type"], "private");

        let body = apply(Platform::Zulip, json!({"type": ""}), "hi", MarkupMode::Markdown);
        assert_eq!(body["type"], "stream");
    }

    #[test]
    fn test_matrix_sets_plain_and_formatted_bodies() {
        let body = apply(
            Platform::Matrix,
            json!({}),
            "<b>Hello</b> World<br>Line2",
            MarkupMode::Html,
        );
        assert_eq!(
            body,
            json!({
                "body": "Hello World\nLine2",
                "formatted_body": "<b>Hello</b> World<br>Line2",
                "msgtype": "m.text",
                "format": "org.matrix.custom.html"
            })
        );
    }

    #[test]
    fn test_push_services() {
        let body = apply(Platform::Gotify, json!({"priority": 5}), "hi", MarkupMode::Text);
        assert_eq!(body, json!({"priority": 5, "message": "hi"}));

        let body = apply(
            Platform::Pushover,
            json!({"token": "t", "user": "u"}),
            "hi",
            MarkupMode::Text,
        );
        assert_eq!(body["message"], "hi");

        let body = apply(Platform::Pushbullet, json!({}), "hi", MarkupMode::Text);
        assert_eq!(body, json!({"body": "hi", "type": "note"}));

        let body = apply(Platform::Apprise, json!({}), "**hi**", MarkupMode::Markdown);
        assert_eq!(body, json!({"body": "**hi**", "format": "markdown"}));
    }

    #[test]
    fn test_ntfy_encoding() {
        let mut map = Map::new();
        assert_eq!(
            Platform::Ntfy.apply(&mut map, "hi", MarkupMode::Text),
            Encoding::Raw
        );

        let mut map = json!({"topic": "alerts"}).as_object().cloned().unwrap();
        assert_eq!(
            Platform::Ntfy.apply(&mut map, "hi", MarkupMode::Text),
            Encoding::Json
        );
        assert_eq!(map["message"], "hi");
    }

    #[test]
    fn test_generic_overwrites_first_known_key_only() {
        let body = apply(
            Platform::Generic,
            json!({"channel": "ops", "body": "old", "text": "old"}),
            "new",
            MarkupMode::Simplified,
        );
        assert_eq!(body, json!({"channel": "ops", "body": "old", "text": "new"}));
    }

    #[test]
    fn test_generic_inserts_message_key() {
        let body = apply(
            Platform::Generic,
            json!({"channel": "ops"}),
            "new",
            MarkupMode::Simplified,
        );
        assert_eq!(body, json!({"channel": "ops", "message": "new"}));
    }
}
