//! Safe markup for chat messages.
//!
//! Visitor text is escaped and never interpreted as markup. Operator text
//! (canned answers and remote answers) may carry limited markup, so it is
//! scrubbed of script-capable content and its links are rewritten:
//! absolute `http`/`https` targets open in a new browsing context without
//! an opener reference, anything else becomes an inert link.

use std::sync::LazyLock;

use chrono::Local;
use mqa_core::types::{Message, Role};
use regex::{Captures, Regex};

static SCRIPT_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)\s*>|<(script|style)\b[^>]*/?>")
        .expect("Invalid script regex")
});

static OPEN_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[a-zA-Z][^>]*>").expect("Invalid tag regex"));

// Attributes may be separated by whitespace or `/`.
static EVENT_HANDLER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)[\s/]+on[a-z]+\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]+)"#).expect("Invalid handler regex")
});

static HREF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)href\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>"']+))"#).expect("Invalid href regex")
});

const INERT_LINK: &str = r##"href="#" aria-disabled="true" onclick="return false;""##;

/// A message ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub role: Role,
    /// Safe markup for the message body.
    pub html: String,
    /// Local wall-clock time, `HH:MM`.
    pub time: String,
}

/// Turns messages into safe markup.
#[derive(Debug, Clone, Copy, Default)]
pub struct SafeFormatter;

impl SafeFormatter {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, message: &Message) -> RenderedMessage {
        let html = match message.role {
            Role::Visitor => escape_html(&message.text),
            Role::Operator => self.format_operator(&message.text),
        };
        RenderedMessage {
            role: message.role,
            html,
            time: message
                .timestamp
                .with_timezone(&Local)
                .format("%H:%M")
                .to_string(),
        }
    }

    /// Scrub and link-sanitize operator-authored markup; newlines become `<br>`.
    pub fn format_operator(&self, text: &str) -> String {
        let scrubbed = SCRIPT_BLOCK_RE.replace_all(text, "");
        let scrubbed = OPEN_TAG_RE.replace_all(&scrubbed, |caps: &Captures<'_>| {
            EVENT_HANDLER_RE.replace_all(&caps[0], "").into_owned()
        });
        let linked = sanitize_links(&scrubbed);
        linked.replace("\r\n", "\n").replace('\n', "<br>")
    }
}

/// Rewrite every `href` attribute in `html`.
pub fn sanitize_links(html: &str) -> String {
    HREF_RE
        .replace_all(html, |caps: &Captures<'_>| {
            let target = caps
                .get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(3))
                .map(|m| m.as_str().trim())
                .unwrap_or_default();
            if is_absolute_http(target) {
                format!(
                    r#"href="{}" target="_blank" rel="noopener noreferrer""#,
                    target.replace('"', "&quot;")
                )
            } else {
                INERT_LINK.to_string()
            }
        })
        .into_owned()
}

fn is_absolute_http(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    ["http://", "https://"]
        .iter()
        .any(|scheme| lower.starts_with(scheme) && lower.len() > scheme.len())
}

/// Escape text for inclusion in markup.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
