//! Markup translation for the lightweight message syntax.
//!
//! Messages use `*text*` for emphasis and `\n` for line breaks. Emphasis is
//! positional: splitting on `*`, every odd-indexed segment is emphasized. No
//! balancing is done, so an unmatched `*` emphasizes everything after it.

use herald_common::types::MarkupMode;

const BOLD_OPEN: &str = "<b>";
const BOLD_CLOSE: &str = "</b>";
const HTML_BREAK: &str = "<br>";

/// Translate `message` into the given markup mode.
pub fn translate(message: &str, mode: MarkupMode) -> String {
    match mode {
        MarkupMode::Html => to_html(message),
        MarkupMode::Markdown => message.replace('*', "**"),
        MarkupMode::Text => message.replace('*', ""),
        MarkupMode::Simplified => message.to_string(),
    }
}

fn to_html(message: &str) -> String {
    let mut out = String::with_capacity(message.len() + 16);
    for (index, segment) in message.split('*').enumerate() {
        if index % 2 == 1 {
            out.push_str(BOLD_OPEN);
            out.push_str(segment);
            out.push_str(BOLD_CLOSE);
        } else {
            out.push_str(segment);
        }
    }
    out.replace('\n', HTML_BREAK)
}

/// Remove emphasis markers produced by any mode (`*`, `<b>`, `</b>`).
pub fn strip_emphasis(text: &str) -> String {
    text.replace(BOLD_OPEN, "")
        .replace(BOLD_CLOSE, "")
        .replace('*', "")
}

/// Plain-text rendering of translated text: emphasis removed, HTML breaks
/// turned back into newlines.
pub fn to_plain(text: &str) -> String {
    strip_emphasis(text).replace(HTML_BREAK, "\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "*Hello* World\nLine2";

    #[test]
    fn test_html() {
        assert_eq!(
            translate(SAMPLE, MarkupMode::Html),
            "<b>Hello</b> World<br>Line2"
        );
    }

    #[test]
    fn test_markdown() {
        assert_eq!(
            translate(SAMPLE, MarkupMode::Markdown),
            "**Hello** World\nLine2"
        );
    }

    #[test]
    fn test_text() {
        assert_eq!(translate(SAMPLE, MarkupMode::Text), "Hello World\nLine2");
    }

    #[test]
    fn test_simplified_is_passthrough() {
        assert_eq!(translate(SAMPLE, MarkupMode::Simplified), SAMPLE);
    }

    #[test]
    fn test_html_unbalanced_marker_toggles_trailing_segment() {
        assert_eq!(translate("a *b* c *d", MarkupMode::Html), "a <b>b</b> c <b>d</b>");
        assert_eq!(translate("*", MarkupMode::Html), "<b></b>");
        assert_eq!(translate("no markers", MarkupMode::Html), "no markers");
    }

    #[test]
    fn test_html_round_trip_recovers_segments() {
        let messages = [
            SAMPLE,
            "",
            "plain",
            "*all bold*",
            "a\n\nb",
            "*x*\n*y* z*",
            "\u{2705} Test notification from *Herald*",
        ];
        for message in messages {
            let html = translate(message, MarkupMode::Html);
            assert_eq!(to_plain(&html), message.replace('*', ""), "message: {:?}", message);
        }
    }

    #[test]
    fn test_strip_emphasis_handles_every_mode() {
        for mode in [MarkupMode::Html, MarkupMode::Markdown, MarkupMode::Text] {
            assert_eq!(strip_emphasis(&translate("*Alert*", mode)), "Alert");
        }
    }
}
