//! Error types for chat orchestration and channel capture.

use voxmap_analytics::AnalyticsError;
use voxmap_core::error::VoxmapError;

/// Errors from the chat engine and the channel relay.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("LLM unavailable: {0}")]
    LlmUnavailable(String),
    #[error("LLM error: {0}")]
    LlmError(String),
    #[error("retrieval error: {0}")]
    RetrievalError(String),
    #[error("analytics error: {0}")]
    AnalyticsError(String),
    #[error("channel error: {0}")]
    ChannelError(String),
    #[error("storage error: {0}")]
    StorageError(String),
}

impl From<VoxmapError> for ChatError {
    fn from(err: VoxmapError) -> Self {
        ChatError::StorageError(err.to_string())
    }
}

impl From<AnalyticsError> for ChatError {
    fn from(err: AnalyticsError) -> Self {
        ChatError::AnalyticsError(err.to_string())
    }
}

impl From<ChatError> for VoxmapError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::ChannelError(msg) => VoxmapError::Channel(msg),
            ChatError::StorageError(msg) => VoxmapError::Storage(msg),
            other => VoxmapError::Chat(other.to_string()),
        }
    }
}
