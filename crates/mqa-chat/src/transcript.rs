//! Plain-text export of the conversation.

use std::fmt::Display;
use std::sync::LazyLock;

use chrono::{DateTime, TimeZone};
use mqa_core::types::{Message, Role};
use regex::Regex;

static BREAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").expect("Invalid break regex"));

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("Invalid tag regex"));

const RULE: &str = "==========================";

/// Sender label for visitor lines.
pub const VISITOR_LABEL: &str = "You";

/// Category line value when nothing is selected.
pub const NOT_SELECTED: &str = "Not selected";

/// Render the transcript of `messages`.
///
/// Times are shown in `generated`'s timezone. Operator lines are labelled
/// with `bot_name`.
pub fn format_transcript<Tz>(
    messages: &[Message],
    category_name: Option<&str>,
    generated: &DateTime<Tz>,
    bot_name: &str,
) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let tz = generated.timezone();
    let mut out = String::new();
    out.push_str("MQA Chat Conversation Log\n");
    out.push_str(RULE);
    out.push_str("\n\n");
    out.push_str(&format!("Generated: {}\n", generated.format("%Y-%m-%d %H:%M:%S")));
    out.push_str(&format!("Category: {}\n", category_name.unwrap_or(NOT_SELECTED)));
    out.push_str(RULE);
    out.push_str("\n\n");

    for message in messages {
        let sender = match message.role {
            Role::Operator => bot_name,
            Role::Visitor => VISITOR_LABEL,
        };
        out.push_str(&format!(
            "[{}] {}: {}\n",
            message.timestamp.with_timezone(&tz).format("%H:%M"),
            sender,
            strip_markup(&message.text)
        ));
    }

    out.push('\n');
    out.push_str(RULE);
    out.push_str("\nEnd of conversation log\n");
    out
}

/// Drop tags, decode the basic entities and flatten line breaks to spaces.
pub fn strip_markup(text: &str) -> String {
    let text = BREAK_RE.replace_all(text, " ");
    let text = TAG_RE.replace_all(&text, "");
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("\r\n", " ")
        .replace('\n', " ")
        .trim()
        .to_string()
}

/// `mqa_chat_<YYYY-MM-DD>_<HH-MM-SS>.txt`
pub fn export_file_name<Tz>(now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!("mqa_chat_{}.txt", now.format("%Y-%m-%d_%H-%M-%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, h, m, 0).unwrap()
    }

    #[test]
    fn test_transcript_layout() {
        let messages = vec![
            Message::new("Welcome to MQABot!", Role::Operator, at(1, 5)),
            Message::new("Selected: APEL", Role::Visitor, at(1, 6)),
        ];
        let generated = at(1, 10);
        let out = format_transcript(&messages, Some("APEL"), &generated, "MQA Bot");

        let expected = "MQA Chat Conversation Log\n\
==========================\n\
\n\
Generated: 2024-06-01 01:10:00\n\
Category: APEL\n\
==========================\n\
\n\
[01:05] MQA Bot: Welcome to MQABot!\n\
[01:06] You: Selected: APEL\n\
\n\
==========================\n\
End of conversation log\n";
        assert_eq!(out, expected);
    }

    #[test]
    fn test_transcript_without_category() {
        let out = format_transcript(&[], None, &at(0, 0), "MQA Bot");
        assert!(out.contains("Category: Not selected\n"));
    }

    #[test]
    fn test_transcript_uses_generated_timezone() {
        let messages = vec![Message::new("hi", Role::Visitor, at(1, 5))];
        let myt = FixedOffset::east_opt(8 * 3600).unwrap();
        let generated = at(1, 10).with_timezone(&myt);
        let out = format_transcript(&messages, None, &generated, "MQA Bot");
        assert!(out.contains("[09:05] You: hi"));
        assert!(out.contains("Generated: 2024-06-01 09:10:00"));
    }

    #[test]
    fn test_strip_markup() {
        assert_eq!(
            strip_markup("For help:\n📞 Phone: 03-7968 7002"),
            "For help: 📞 Phone: 03-7968 7002"
        );
        assert_eq!(
            strip_markup(r#"See <a href="https://mqa.gov.my">MQA</a><br>now &amp; later"#),
            "See MQA now & later"
        );
        assert_eq!(strip_markup("a &lt;b&gt; c"), "a <b> c");
    }

    #[test]
    fn test_export_file_name() {
        let now = Utc.with_ymd_and_hms(2024, 12, 31, 23, 4, 5).unwrap();
        assert_eq!(export_file_name(&now), "mqa_chat_2024-12-31_23-04-05.txt");
    }
}
