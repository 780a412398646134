use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// =============================================================================
// Enums
// =============================================================================

/// Who authored a message.
///
/// Visitor text is never interpreted as markup; operator text may carry
/// limited markup (formatted answers, links).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Visitor,
    Operator,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Visitor => write!(f, "visitor"),
            Role::Operator => write!(f, "operator"),
        }
    }
}

// =============================================================================
// Messages
// =============================================================================

/// A single timestamped line of the conversation. Immutable once created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    /// Persisted under `type` to stay readable by earlier snapshots.
    #[serde(rename = "type")]
    pub role: Role,
    #[serde(with = "iso_millis")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(text: impl Into<String>, role: Role, timestamp: DateTime<Utc>) -> Self {
        Self {
            text: text.into(),
            role,
            timestamp,
        }
    }
}

// =============================================================================
// Persistence
// =============================================================================

/// Complete persisted representation of the conversation.
///
/// Replaced wholesale on every save. Unknown fields are ignored and missing
/// fields default to the empty state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSnapshot {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub selected_category: Option<String>,
    #[serde(default, with = "iso_millis::option")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl PersistedSnapshot {
    /// True when there is nothing worth restoring.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.selected_category.is_none()
    }
}

/// Reads `null` the same as an absent list.
fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Message>, D::Error> {
    Ok(Option::<Vec<Message>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Millisecond-precision RFC 3339 timestamps with a `Z` suffix, the shape a
/// browser's `Date.toISOString()` produces. Any RFC 3339 input is accepted.
pub mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(ts: &DateTime<Utc>) -> String {
        ts.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            ts: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match ts {
                Some(ts) => serializer.serialize_str(&super::format(ts)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            let raw: Option<String> = Option::deserialize(deserializer)?;
            raw.map(|s| {
                DateTime::parse_from_rfc3339(&s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(serde::de::Error::custom)
            })
            .transpose()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 9, 7, 30).unwrap()
    }

    // ---- Role ----

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Visitor).unwrap(), "\"visitor\"");
        assert_eq!(serde_json::to_string(&Role::Operator).unwrap(), "\"operator\"");
    }

    #[test]
    fn test_role_display() {
        assert_eq!(Role::Visitor.to_string(), "visitor");
        assert_eq!(Role::Operator.to_string(), "operator");
    }

    // ---- Message wire shape ----

    #[test]
    fn test_message_uses_type_field_and_millis() {
        let msg = Message::new("hello", Role::Visitor, fixed_time());
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["text"], "hello");
        assert_eq!(json["type"], "visitor");
        assert_eq!(json["timestamp"], "2024-03-05T09:07:30.000Z");
    }

    #[test]
    fn test_message_reads_browser_written_json() {
        let raw = r#"{"text":"Welcome to MQABot!","type":"operator","timestamp":"2024-03-05T09:07:30.123Z"}"#;
        let msg: Message = serde_json::from_str(raw).unwrap();
        assert_eq!(msg.role, Role::Operator);
        assert_eq!(msg.text, "Welcome to MQABot!");
        assert_eq!(msg.timestamp.timestamp_subsec_millis(), 123);
    }

    #[test]
    fn test_message_rejects_bad_timestamp() {
        let raw = r#"{"text":"x","type":"operator","timestamp":"yesterday"}"#;
        assert!(serde_json::from_str::<Message>(raw).is_err());
    }

    // ---- Snapshot ----

    #[test]
    fn test_snapshot_missing_fields_default() {
        let snap: PersistedSnapshot = serde_json::from_str("{}").unwrap();
        assert!(snap.is_empty());
        assert!(snap.timestamp.is_none());
    }

    #[test]
    fn test_snapshot_ignores_unknown_fields() {
        let raw = r#"{"selectedCategory":"faq","theme":"dark","messages":[]}"#;
        let snap: PersistedSnapshot = serde_json::from_str(raw).unwrap();
        assert_eq!(snap.selected_category.as_deref(), Some("faq"));
        assert!(!snap.is_empty());
    }

    #[test]
    fn test_snapshot_camel_case_keys() {
        let snap = PersistedSnapshot {
            messages: vec![Message::new("q", Role::Visitor, fixed_time())],
            selected_category: Some("apel-a".to_string()),
            timestamp: Some(fixed_time()),
        };
        let json: serde_json::Value = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["selectedCategory"], "apel-a");
        assert_eq!(json["timestamp"], "2024-03-05T09:07:30.000Z");
        assert_eq!(json["messages"][0]["type"], "visitor");
    }

    #[test]
    fn test_snapshot_null_messages_read_as_empty() {
        let raw = r#"{"messages":null,"selectedCategory":"faq"}"#;
        let snap: PersistedSnapshot = serde_json::from_str(raw).unwrap();
        assert!(snap.messages.is_empty());
        assert_eq!(snap.selected_category.as_deref(), Some("faq"));
    }

    #[test]
    fn test_snapshot_null_category() {
        let raw = r#"{"messages":[],"selectedCategory":null,"timestamp":null}"#;
        let snap: PersistedSnapshot = serde_json::from_str(raw).unwrap();
        assert!(snap.selected_category.is_none());
        assert!(snap.is_empty());
    }
}
