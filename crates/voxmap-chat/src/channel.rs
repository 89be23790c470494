//! Capture of voice-agent channel events into the message store.
//!
//! Two event streams are understood. The conversational agent stream only
//! carries `conversation_initiation_metadata`, `user_transcript` and
//! `user_message` events worth storing; every other type is dropped. The
//! text-to-speech stream has no typed user events, so its server frames are
//! searched for a text payload under one of several keys.

use std::sync::Arc;

use serde_json::{json, Value};
use uuid::Uuid;

use voxmap_core::types::{channel, NewQuestion};
use voxmap_storage::MessageStore;

use crate::error::ChatError;

/// Keys that may carry text in text-to-speech stream frames, by priority.
const TEXT_PAYLOAD_KEYS: &[&str] = &[
    "text",
    "transcript",
    "finalTranscript",
    "speechToText",
    "recognizedText",
];

/// User recorded for text sent out on the text-to-speech stream.
const OUTGOING_USER: &str = "local-user";

/// The event stream a frame was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Agents,
    TextToSpeech,
}

/// A decoded channel frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    ConversationStarted {
        conversation_id: String,
    },
    UserTranscript {
        text: String,
        user_id: Option<String>,
    },
    UserMessage {
        text: String,
        user_id: Option<String>,
    },
    /// Text found in a text-to-speech stream frame.
    TextPayload {
        text: String,
    },
    /// A frame carrying nothing to store (agent replies, audio chunks, pings, empty text).
    Ignored,
}

impl ChannelEvent {
    /// Decode a raw frame. Non-JSON frames yield `None`.
    pub fn parse(frame: &str, kind: StreamKind) -> Option<Self> {
        serde_json::from_str::<Value>(frame)
            .ok()
            .map(|data| Self::from_value(&data, kind))
    }

    pub fn from_value(data: &Value, kind: StreamKind) -> Self {
        match kind {
            StreamKind::Agents => Self::from_agent_event(data),
            StreamKind::TextToSpeech => Self::from_tts_frame(data),
        }
    }

    fn from_agent_event(data: &Value) -> Self {
        match data.get("type").and_then(Value::as_str).unwrap_or("") {
            "conversation_initiation_metadata" => data
                .get("conversation_initiation_metadata")
                .and_then(|m| non_empty_str(m.get("conversation_id")))
                .map(|id| ChannelEvent::ConversationStarted {
                    conversation_id: id,
                })
                .unwrap_or(ChannelEvent::Ignored),
            "user_transcript" => {
                let event = data.get("user_transcription_event");
                match event.and_then(|e| non_empty_str(e.get("user_transcript"))) {
                    Some(text) => ChannelEvent::UserTranscript {
                        text,
                        user_id: event.and_then(|e| non_empty_str(e.get("user_id"))),
                    },
                    None => ChannelEvent::Ignored,
                }
            }
            "user_message" => {
                let text = non_empty_str(data.get("text")).or_else(|| {
                    data.get("user_message")
                        .and_then(|m| non_empty_str(m.get("text")))
                });
                match text {
                    Some(text) => ChannelEvent::UserMessage {
                        text,
                        user_id: non_empty_str(data.get("user_id")),
                    },
                    None => ChannelEvent::Ignored,
                }
            }
            _ => ChannelEvent::Ignored,
        }
    }

    fn from_tts_frame(data: &Value) -> Self {
        if data.get("type").and_then(Value::as_str) == Some("audioOutput") {
            return ChannelEvent::Ignored;
        }
        TEXT_PAYLOAD_KEYS
            .iter()
            .find_map(|key| {
                data.get(*key)
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
            })
            .map(|text| ChannelEvent::TextPayload {
                text: text.to_string(),
            })
            .unwrap_or(ChannelEvent::Ignored)
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

/// Persists the text-bearing events of one channel connection.
///
/// Tracks the current conversation id so that later transcripts are filed
/// under the right session.
pub struct CaptureHandler {
    store: Arc<dyn MessageStore>,
    kind: StreamKind,
    channel: String,
    default_user: String,
    default_session: String,
    conversation_id: Option<String>,
}

impl CaptureHandler {
    pub fn new(
        store: Arc<dyn MessageStore>,
        kind: StreamKind,
        channel: impl Into<String>,
        default_user: impl Into<String>,
        default_session: impl Into<String>,
    ) -> Self {
        Self {
            store,
            kind,
            channel: channel.into(),
            default_user: default_user.into(),
            default_session: default_session.into(),
            conversation_id: None,
        }
    }

    /// Handler for the conversational agent stream.
    pub fn agents(store: Arc<dyn MessageStore>) -> Self {
        Self::new(
            store,
            StreamKind::Agents,
            channel::ELEVEN_AGENTS_WS,
            "eleven_user",
            "unknown",
        )
    }

    /// Handler for incoming frames of the text-to-speech stream.
    pub fn tts_stream(store: Arc<dyn MessageStore>) -> Self {
        Self::new(
            store,
            StreamKind::TextToSpeech,
            channel::ELEVEN_WS_IN,
            "eleven",
            "eleven",
        )
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    /// Process one raw frame; returns the id of the stored record, if any.
    pub fn handle_frame(&mut self, frame: &str) -> Result<Option<Uuid>, ChatError> {
        let Ok(data) = serde_json::from_str::<Value>(frame) else {
            tracing::trace!(channel = %self.channel, "Ignoring non-JSON frame");
            return Ok(None);
        };
        let event = ChannelEvent::from_value(&data, self.kind);
        self.handle_event(event, data)
    }

    /// Process a decoded event; `raw` is stored as the record's metadata.
    pub fn handle_event(&mut self, event: ChannelEvent, raw: Value) -> Result<Option<Uuid>, ChatError> {
        let (text, user_id) = match event {
            ChannelEvent::ConversationStarted { conversation_id } => {
                tracing::info!(channel = %self.channel, conversation = %conversation_id, "Conversation started");
                self.conversation_id = Some(conversation_id);
                return Ok(None);
            }
            ChannelEvent::UserTranscript { text, user_id }
            | ChannelEvent::UserMessage { text, user_id } => (text, user_id),
            ChannelEvent::TextPayload { text } => (text, None),
            ChannelEvent::Ignored => return Ok(None),
        };

        let session = self
            .conversation_id
            .clone()
            .unwrap_or_else(|| self.default_session.clone());
        let user = user_id.unwrap_or_else(|| self.default_user.clone());

        let question = NewQuestion::new(user, session, self.channel.clone(), text.clone())
            .with_metadata(json!({ "raw_event": raw }));
        let id = self.store.save_question(question)?;

        tracing::info!(
            channel = %self.channel,
            id = %id,
            text = %preview(&text),
            "Captured channel message"
        );
        Ok(Some(id))
    }

    /// Store text that was sent out on the stream, filed under the local user.
    ///
    /// Blank text is skipped.
    pub fn record_outgoing(&self, text: &str) -> Result<Option<Uuid>, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        let question =
            NewQuestion::new(OUTGOING_USER, OUTGOING_USER, channel::ELEVEN_WS_OUT, text);
        let id = self.store.save_question(question)?;
        tracing::info!(
            channel = channel::ELEVEN_WS_OUT,
            id = %id,
            text = %preview(text),
            "Recorded outgoing message"
        );
        Ok(Some(id))
    }
}

fn preview(text: &str) -> String {
    text.chars().take(80).collect()
}
