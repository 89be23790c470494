//! Sentiment classification of user messages.

use std::sync::Arc;

use async_trait::async_trait;

use voxmap_analytics::{parse_sentiment, sentiment_prompt, SentimentResult};

use crate::llm::{CompletionRequest, LlmClient, LlmMessage};

const CLASSIFIER_SYSTEM_PROMPT: &str = "Retorne JSON estrito.";
const CLASSIFIER_MAX_TOKENS: u32 = 150;

#[async_trait]
pub trait SentimentClassifier: Send + Sync {
    fn is_enabled(&self) -> bool {
        true
    }

    /// Classify `text`. Failures are reported as [`SentimentResult::failed`].
    async fn classify(&self, text: &str) -> SentimentResult;
}

/// Classifier that asks a language model for a strict-JSON verdict.
pub struct LlmSentimentClassifier {
    llm: Arc<dyn LlmClient>,
    model: String,
}

impl LlmSentimentClassifier {
    pub fn new(llm: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
        }
    }
}

#[async_trait]
impl SentimentClassifier for LlmSentimentClassifier {
    async fn classify(&self, text: &str) -> SentimentResult {
        let request = CompletionRequest {
            model: self.model.clone(),
            messages: vec![
                LlmMessage::system(CLASSIFIER_SYSTEM_PROMPT),
                LlmMessage::user(sentiment_prompt(text)),
            ],
            temperature: 0.0,
            max_tokens: CLASSIFIER_MAX_TOKENS,
        };

        let raw = match self.llm.complete(&request).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(model = %self.model, error = %e, "Sentiment request failed");
                return SentimentResult::failed(e);
            }
        };

        match parse_sentiment(&raw) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(model = %self.model, error = %e, "Sentiment reply rejected");
                SentimentResult::failed(e)
            }
        }
    }
}

/// Classifier used when sentiment analysis is switched off.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledSentiment;

#[async_trait]
impl SentimentClassifier for DisabledSentiment {
    fn is_enabled(&self) -> bool {
        false
    }

    async fn classify(&self, _: &str) -> SentimentResult {
        SentimentResult::failed("análise de sentimento desabilitada")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::error::ChatError;
    use crate::llm::UnavailableLlm;
    use voxmap_analytics::SentimentLabel;

    struct CannedLlm {
        reply: String,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    #[async_trait]
    impl LlmClient for CannedLlm {
        fn name(&self) -> &str {
            "canned"
        }

        async fn complete(&self, request: &CompletionRequest) -> Result<String, ChatError> {
            self.seen.lock().unwrap().push(request.clone());
            Ok(self.reply.clone())
        }
    }

    fn canned(reply: &str) -> Arc<CannedLlm> {
        Arc::new(CannedLlm {
            reply: reply.to_string(),
            seen: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn test_classifies_with_strict_json_request() {
        let llm = canned(r#"{"label":"negativo","confidence":0.9,"emotions":["raiva"],"reason":"atraso"}"#);
        let classifier = LlmSentimentClassifier::new(llm.clone(), "gpt-4.1-mini");

        let result = classifier.classify("Meu pedido atrasou de novo").await;
        assert_eq!(result.label, SentimentLabel::Negativo);
        assert_eq!(result.emotions, vec!["raiva"]);

        let seen = llm.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].model, "gpt-4.1-mini");
        assert_eq!(seen[0].temperature, 0.0);
        assert_eq!(seen[0].messages[0].content, "Retorne JSON estrito.");
        assert!(seen[0].messages[1].content.ends_with("Meu pedido atrasou de novo"));
    }

    #[tokio::test]
    async fn test_malformed_reply_degrades_to_failed() {
        let classifier = LlmSentimentClassifier::new(canned("talvez negativo?"), "m");
        let result = classifier.classify("texto").await;
        assert_eq!(result.label, SentimentLabel::Neutro);
        assert_eq!(result.confidence, 0.0);
        assert!(result.reason.starts_with("Falha na análise:"));
    }

    #[tokio::test]
    async fn test_llm_failure_degrades_to_failed() {
        let classifier = LlmSentimentClassifier::new(Arc::new(UnavailableLlm), "m");
        let result = classifier.classify("texto").await;
        assert!(result.reason.contains("LLM unavailable"));
    }

    #[tokio::test]
    async fn test_disabled_sentiment() {
        assert!(!DisabledSentiment.is_enabled());
        let result = DisabledSentiment.classify("texto").await;
        assert_eq!(result.label, SentimentLabel::Neutro);
    }
}
