use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Channels
// =============================================================================

/// Tag naming where a captured message came from.
///
/// Stored as a plain string so records written by other tools (or future
/// channels) still load; the constants below are the ones VoxMap writes.
pub mod channel {
    pub const CHAT_UI: &str = "chat_ui";
    pub const WHATSAPP: &str = "whatsapp";
    pub const ELEVEN_WEBHOOK: &str = "eleven_webhook";
    pub const ELEVEN_AGENTS_WS: &str = "eleven_agents_ws";
    pub const ELEVEN_WS_IN: &str = "eleven_ws_in";
    pub const ELEVEN_WS_OUT: &str = "eleven_ws_out";
}

// =============================================================================
// Message records
// =============================================================================

/// A persisted user message with its downstream processing references.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: Uuid,
    pub user_id: String,
    pub session_id: String,
    pub channel: String,
    pub text: String,
    #[serde(default)]
    pub normalized_text: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub embedding_id: Option<String>,
    #[serde(default)]
    pub rag_result_id: Option<String>,
    #[serde(default)]
    pub tts_generated: bool,
    #[serde(default)]
    pub audio_uri: Option<String>,
    #[serde(default = "empty_metadata")]
    pub metadata: serde_json::Value,
}

fn empty_metadata() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// Input for creating a [`MessageRecord`]; id and timestamp are assigned on save.
#[derive(Clone, Debug, Default)]
pub struct NewQuestion {
    pub user_id: String,
    pub session_id: String,
    pub channel: String,
    pub text: String,
    pub normalized_text: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl NewQuestion {
    pub fn new(
        user_id: impl Into<String>,
        session_id: impl Into<String>,
        channel: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            session_id: session_id.into(),
            channel: channel.into(),
            text: text.into(),
            normalized_text: None,
            metadata: None,
        }
    }

    pub fn with_normalized_text(mut self, normalized: impl Into<String>) -> Self {
        self.normalized_text = Some(normalized.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Materialize the record with a fresh id and the given timestamp.
    pub fn into_record(self, timestamp: DateTime<Utc>) -> MessageRecord {
        MessageRecord {
            id: Uuid::new_v4(),
            user_id: self.user_id,
            session_id: self.session_id,
            channel: self.channel,
            text: self.text,
            normalized_text: self.normalized_text,
            timestamp,
            embedding_id: None,
            rag_result_id: None,
            tts_generated: false,
            audio_uri: None,
            metadata: self.metadata.unwrap_or_else(empty_metadata),
        }
    }
}

/// Fixed-width RFC 3339 rendering (microseconds, `Z` suffix) so that stored
/// timestamps sort lexicographically in time order.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_new_question_into_record() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let record = NewQuestion::new("u1", "s1", channel::WHATSAPP, "Olá, preciso de ajuda")
            .with_normalized_text("olá preciso ajuda")
            .into_record(ts);

        assert_eq!(record.user_id, "u1");
        assert_eq!(record.session_id, "s1");
        assert_eq!(record.channel, "whatsapp");
        assert_eq!(record.normalized_text.as_deref(), Some("olá preciso ajuda"));
        assert_eq!(record.timestamp, ts);
        assert!(!record.tts_generated);
        assert!(record.metadata.as_object().unwrap().is_empty());
    }

    #[test]
    fn test_record_ids_are_unique() {
        let ts = Utc::now();
        let a = NewQuestion::new("u", "s", "c", "t").into_record(ts);
        let b = NewQuestion::new("u", "s", "c", "t").into_record(ts);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_record_deserializes_with_missing_optional_fields() {
        let json = r#"{
            "id": "550e8400-e29b-41d4-a716-446655440000",
            "user_id": "u",
            "session_id": "s",
            "channel": "eleven_webhook",
            "text": "oi",
            "timestamp": "2025-03-01T12:00:00Z"
        }"#;
        let record: MessageRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.embedding_id, None);
        assert!(!record.tts_generated);
        assert!(record.metadata.is_object());
    }

    #[test]
    fn test_format_timestamp_sorts_lexicographically() {
        let early = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();
        let late = early + chrono::Duration::milliseconds(1500);
        let a = format_timestamp(&early);
        let b = format_timestamp(&late);
        assert_eq!(a, "2025-01-01T09:00:00.000000Z");
        assert!(a < b);
    }
}
