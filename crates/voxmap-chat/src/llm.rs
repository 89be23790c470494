//! Language-model client interface.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ChatError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmMessage {
    pub role: ChatRole,
    pub content: String,
}

impl LlmMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// A chat-completion call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<LlmMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Backend producing assistant replies.
#[async_trait]
pub trait LlmClient: Send + Sync {
    fn name(&self) -> &str;

    /// Complete the conversation and return the assistant's text.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ChatError>;
}

/// Client used when no model backend is configured. Every call fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableLlm;

#[async_trait]
impl LlmClient for UnavailableLlm {
    fn name(&self) -> &str {
        "unavailable"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, ChatError> {
        Err(ChatError::LlmUnavailable(format!(
            "no client configured for model '{}'",
            request.model
        )))
    }
}
