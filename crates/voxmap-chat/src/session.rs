//! Per-session conversational state.

use serde::{Deserialize, Serialize};

use voxmap_analytics::{SentimentPoint, SentimentResult, WordFrequencies};

use crate::llm::LlmMessage;
use crate::retrieval::RetrievedDoc;

/// One entry of the visible conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum ChatEntry {
    User { content: String },
    Assistant { content: String },
    /// Documents that grounded the preceding assistant reply.
    RagContext { docs: Vec<RetrievedDoc> },
}

/// Everything a chat session accumulates: history, the word corpus that
/// feeds the word cloud and graph, and the sentiment trail.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    pub session_id: String,
    pub messages: Vec<ChatEntry>,
    /// Space-joined content words of every user message.
    pub corpus_text: String,
    /// Content words per user message, in arrival order.
    pub token_sequences: Vec<Vec<String>>,
    pub current_sentiment: Option<SentimentResult>,
    pub sentiment_history: Vec<SentimentPoint>,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            ..Self::default()
        }
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(ChatEntry::User {
            content: content.into(),
        });
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(ChatEntry::Assistant {
            content: content.into(),
        });
    }

    pub fn push_rag_context(&mut self, docs: Vec<RetrievedDoc>) {
        self.messages.push(ChatEntry::RagContext { docs });
    }

    /// Add a message's content words to the corpus. Empty token lists are
    /// ignored.
    pub fn add_tokens(&mut self, tokens: Vec<String>) {
        if tokens.is_empty() {
            return;
        }
        self.corpus_text.push(' ');
        self.corpus_text.push_str(&tokens.join(" "));
        self.token_sequences.push(tokens);
    }

    pub fn user_message_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| matches!(m, ChatEntry::User { .. }))
            .count()
    }

    pub fn last_user_message(&self) -> Option<&str> {
        self.messages.iter().rev().find_map(|m| match m {
            ChatEntry::User { content } => Some(content.as_str()),
            _ => None,
        })
    }

    /// Conversation as sent to the model: user and assistant turns only.
    pub fn llm_history(&self) -> Vec<LlmMessage> {
        self.messages
            .iter()
            .filter_map(|m| match m {
                ChatEntry::User { content } => Some(LlmMessage::user(content.clone())),
                ChatEntry::Assistant { content } => Some(LlmMessage::assistant(content.clone())),
                ChatEntry::RagContext { .. } => None,
            })
            .collect()
    }

    pub fn word_frequencies(&self) -> WordFrequencies {
        WordFrequencies::from_sequences(&self.token_sequences)
    }

    /// Forget the word corpus; chat history and sentiment stay.
    pub fn clear_word_cloud(&mut self) {
        self.corpus_text.clear();
        self.token_sequences.clear();
    }

    /// Reset the session to its initial state, keeping its id.
    pub fn clear_chat(&mut self) {
        self.messages.clear();
        self.current_sentiment = None;
        self.sentiment_history.clear();
        self.clear_word_cloud();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatRole;

    fn tokens(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_add_tokens_updates_corpus_and_sequences() {
        let mut ctx = SessionContext::new("s1");
        ctx.add_tokens(tokens(&["pedido", "atrasado"]));
        ctx.add_tokens(Vec::new());
        ctx.add_tokens(tokens(&["pedido"]));

        assert_eq!(ctx.corpus_text, " pedido atrasado pedido");
        assert_eq!(ctx.token_sequences.len(), 2);
        assert_eq!(ctx.word_frequencies().count("pedido"), 2);
    }

    #[test]
    fn test_llm_history_skips_rag_entries() {
        let mut ctx = SessionContext::new("s1");
        ctx.push_user("oi");
        ctx.push_assistant("olá!");
        ctx.push_rag_context(vec![RetrievedDoc::new("doc", "faq", 0.9)]);
        ctx.push_user("tudo bem?");

        let history = ctx.llm_history();
        assert_eq!(history.len(), 3);
        assert_eq!(history[1].role, ChatRole::Assistant);
        assert_eq!(ctx.user_message_count(), 2);
        assert_eq!(ctx.last_user_message(), Some("tudo bem?"));
    }

    #[test]
    fn test_clear_word_cloud_keeps_history() {
        let mut ctx = SessionContext::new("s1");
        ctx.push_user("pedido atrasado");
        ctx.add_tokens(tokens(&["pedido", "atrasado"]));
        ctx.clear_word_cloud();

        assert!(ctx.corpus_text.is_empty());
        assert!(ctx.token_sequences.is_empty());
        assert_eq!(ctx.messages.len(), 1);
    }

    #[test]
    fn test_clear_chat_resets_everything_but_id() {
        let mut ctx = SessionContext::new("s1");
        ctx.push_user("pedido");
        ctx.add_tokens(tokens(&["pedido"]));
        ctx.current_sentiment = Some(SentimentResult::failed("x"));
        ctx.sentiment_history
            .push(SentimentPoint::new(1, &SentimentResult::failed("x")));

        ctx.clear_chat();
        assert_eq!(ctx, SessionContext::new("s1"));
    }

    #[test]
    fn test_entries_serialize_with_role_tag() {
        let json = serde_json::to_value(ChatEntry::RagContext { docs: vec![] }).unwrap();
        assert_eq!(json["role"], "rag_context");
        let json = serde_json::to_value(ChatEntry::User {
            content: "oi".to_string(),
        })
        .unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "oi");
    }
}
