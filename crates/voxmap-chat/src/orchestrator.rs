//! Chat orchestrator: runs one user turn through tokenization, sentiment,
//! retrieval and the language model.

use std::sync::Arc;

use voxmap_analytics::{tokenize, SentimentPoint, SentimentResult};
use voxmap_core::config::{ChatConfig, RetrievalConfig};

use crate::error::ChatError;
use crate::llm::{CompletionRequest, LlmClient, LlmMessage};
use crate::retrieval::{format_rag_context, NoRetrieval, RetrievedDoc, Retriever};
use crate::sentiment::{DisabledSentiment, LlmSentimentClassifier, SentimentClassifier};
use crate::session::SessionContext;

/// Result of a successful turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub answer: String,
    pub sentiment: Option<SentimentResult>,
    pub documents: Vec<RetrievedDoc>,
}

/// Coordinates the collaborators of a chat turn. Holds no session state;
/// every call receives the [`SessionContext`] it works on.
pub struct ChatOrchestrator {
    config: ChatConfig,
    retrieval: RetrievalConfig,
    llm: Arc<dyn LlmClient>,
    retriever: Arc<dyn Retriever>,
    sentiment: Arc<dyn SentimentClassifier>,
}

impl ChatOrchestrator {
    /// Sentiment runs through `llm` with `config.sentiment_model` when
    /// enabled; retrieval starts disabled until a retriever is attached.
    pub fn new(config: ChatConfig, retrieval: RetrievalConfig, llm: Arc<dyn LlmClient>) -> Self {
        let sentiment: Arc<dyn SentimentClassifier> = if config.sentiment_enabled {
            Arc::new(LlmSentimentClassifier::new(
                Arc::clone(&llm),
                config.sentiment_model.clone(),
            ))
        } else {
            Arc::new(DisabledSentiment)
        };

        Self {
            config,
            retrieval,
            llm,
            retriever: Arc::new(NoRetrieval),
            sentiment,
        }
    }

    pub fn with_retriever(mut self, retriever: Arc<dyn Retriever>) -> Self {
        self.retriever = retriever;
        self
    }

    pub fn with_sentiment(mut self, sentiment: Arc<dyn SentimentClassifier>) -> Self {
        self.sentiment = sentiment;
        self
    }

    /// Handle an incoming user message for `ctx`.
    ///
    /// The user message, its tokens and its sentiment are recorded even when
    /// the model call fails; in that case no assistant entry is appended.
    pub async fn handle_user_message(
        &self,
        ctx: &mut SessionContext,
        message: &str,
    ) -> Result<ChatReply, ChatError> {
        if message.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if message.chars().count() > self.config.max_message_length {
            return Err(ChatError::MessageTooLong(self.config.max_message_length));
        }

        ctx.push_user(message);
        ctx.add_tokens(tokenize(message));

        let sentiment = if self.config.sentiment_enabled && self.sentiment.is_enabled() {
            let result = self.sentiment.classify(message).await;
            ctx.sentiment_history
                .push(SentimentPoint::new(ctx.user_message_count(), &result));
            ctx.current_sentiment = Some(result.clone());
            Some(result)
        } else {
            None
        };

        let documents = self.retrieve_context(ctx).await;

        let mut system_prompt = self.config.system_prompt.trim().to_string();
        system_prompt.push_str(&format_rag_context(&documents));

        let mut messages = vec![LlmMessage::system(system_prompt)];
        messages.extend(ctx.llm_history());

        let request = CompletionRequest {
            model: self.config.model.clone(),
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let answer = self.llm.complete(&request).await.map_err(|e| {
            tracing::error!(
                session = %ctx.session_id,
                llm = self.llm.name(),
                error = %e,
                "Chat completion failed"
            );
            e
        })?;

        ctx.push_assistant(answer.clone());
        if !documents.is_empty() {
            ctx.push_rag_context(documents.clone());
        }

        tracing::info!(
            session = %ctx.session_id,
            user_messages = ctx.user_message_count(),
            documents = documents.len(),
            "Chat turn completed"
        );

        Ok(ChatReply {
            answer,
            sentiment,
            documents,
        })
    }

    /// Query the retriever with the latest user message. Failures are
    /// logged and yield no documents.
    async fn retrieve_context(&self, ctx: &SessionContext) -> Vec<RetrievedDoc> {
        if !self.retrieval.enabled {
            return Vec::new();
        }
        let Some(query) = ctx.last_user_message() else {
            return Vec::new();
        };

        match self
            .retriever
            .retrieve(query, self.retrieval.top_k, self.retrieval.score_threshold)
            .await
        {
            Ok(docs) => docs,
            Err(e) => {
                tracing::warn!(session = %ctx.session_id, error = %e, "Retrieval failed, answering without context");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::llm::{ChatRole, UnavailableLlm};
    use crate::session::ChatEntry;
    use voxmap_analytics::SentimentLabel;

    /// Replies with a fixed answer and records every request.
    struct ScriptedLlm {
        answer: String,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedLlm {
        fn new(answer: &str) -> Arc<Self> {
            Arc::new(Self {
                answer: answer.to_string(),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, request: &CompletionRequest) -> Result<String, ChatError> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(self.answer.clone())
        }
    }

    struct FixedSentiment(SentimentLabel);

    #[async_trait]
    impl SentimentClassifier for FixedSentiment {
        async fn classify(&self, _: &str) -> SentimentResult {
            SentimentResult {
                label: self.0,
                confidence: 0.8,
                emotions: vec![],
                reason: String::new(),
            }
        }
    }

    struct StaticRetriever(Vec<RetrievedDoc>);

    #[async_trait]
    impl Retriever for StaticRetriever {
        async fn retrieve(
            &self,
            _: &str,
            top_k: usize,
            _: f32,
        ) -> Result<Vec<RetrievedDoc>, ChatError> {
            Ok(self.0.iter().take(top_k).cloned().collect())
        }
    }

    struct BrokenRetriever;

    #[async_trait]
    impl Retriever for BrokenRetriever {
        async fn retrieve(&self, _: &str, _: usize, _: f32) -> Result<Vec<RetrievedDoc>, ChatError> {
            Err(ChatError::RetrievalError("vector store offline".to_string()))
        }
    }

    fn retrieval_on() -> RetrievalConfig {
        RetrievalConfig {
            enabled: true,
            ..RetrievalConfig::default()
        }
    }

    // ============================================================
    // Validation
    // ============================================================

    #[tokio::test]
    async fn test_rejects_empty_and_long_messages() {
        let orch = ChatOrchestrator::new(
            ChatConfig::default(),
            RetrievalConfig::default(),
            ScriptedLlm::new("ok"),
        );
        let mut ctx = SessionContext::new("s1");

        assert!(matches!(
            orch.handle_user_message(&mut ctx, "   ").await,
            Err(ChatError::EmptyMessage)
        ));
        let long = "a".repeat(2001);
        assert!(matches!(
            orch.handle_user_message(&mut ctx, &long).await,
            Err(ChatError::MessageTooLong(2000))
        ));
        assert!(ctx.messages.is_empty());

        // Exactly at the limit, counted in characters.
        let at_limit = "ç".repeat(2000);
        assert!(orch.handle_user_message(&mut ctx, &at_limit).await.is_ok());
    }

    // ============================================================
    // Turn flow
    // ============================================================

    #[tokio::test]
    async fn test_turn_updates_session_and_calls_llm() {
        let llm = ScriptedLlm::new("Vamos verificar seu pedido.");
        let orch = ChatOrchestrator::new(ChatConfig::default(), RetrievalConfig::default(), llm.clone())
            .with_sentiment(Arc::new(FixedSentiment(SentimentLabel::Negativo)));
        let mut ctx = SessionContext::new("s1");

        let reply = orch
            .handle_user_message(&mut ctx, "Meu pedido não chegou")
            .await
            .unwrap();

        assert_eq!(reply.answer, "Vamos verificar seu pedido.");
        assert_eq!(reply.sentiment.as_ref().unwrap().label, SentimentLabel::Negativo);
        assert_eq!(ctx.messages.len(), 2);
        assert_eq!(ctx.token_sequences, vec![vec!["pedido".to_string(), "chegou".to_string()]]);
        assert_eq!(ctx.sentiment_history.len(), 1);
        assert_eq!(ctx.sentiment_history[0].idx, 1);
        assert_eq!(ctx.sentiment_history[0].score, -0.8);

        let requests = llm.requests.lock().unwrap();
        let sent = &requests[0];
        assert_eq!(sent.model, "gpt-4.1-mini");
        assert_eq!(sent.messages[0].role, ChatRole::System);
        assert_eq!(sent.messages.last().unwrap().content, "Meu pedido não chegou");
    }

    #[tokio::test]
    async fn test_sentiment_index_counts_user_messages() {
        let orch = ChatOrchestrator::new(
            ChatConfig::default(),
            RetrievalConfig::default(),
            ScriptedLlm::new("ok"),
        )
        .with_sentiment(Arc::new(FixedSentiment(SentimentLabel::Positivo)));
        let mut ctx = SessionContext::new("s1");

        for msg in ["obrigado", "ótimo atendimento", "resolvido"] {
            orch.handle_user_message(&mut ctx, msg).await.unwrap();
        }
        let idx: Vec<usize> = ctx.sentiment_history.iter().map(|p| p.idx).collect();
        assert_eq!(idx, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_sentiment_disabled_by_config() {
        let config = ChatConfig {
            sentiment_enabled: false,
            ..ChatConfig::default()
        };
        let orch = ChatOrchestrator::new(config, RetrievalConfig::default(), ScriptedLlm::new("ok"))
            .with_sentiment(Arc::new(FixedSentiment(SentimentLabel::Negativo)));
        let mut ctx = SessionContext::new("s1");

        let reply = orch.handle_user_message(&mut ctx, "pedido").await.unwrap();
        assert!(reply.sentiment.is_none());
        assert!(ctx.sentiment_history.is_empty());
    }

    #[tokio::test]
    async fn test_llm_failure_keeps_user_message_only() {
        let orch = ChatOrchestrator::new(
            ChatConfig::default(),
            RetrievalConfig::default(),
            Arc::new(UnavailableLlm),
        );
        let mut ctx = SessionContext::new("s1");

        let err = orch
            .handle_user_message(&mut ctx, "cadê meu reembolso")
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::LlmUnavailable(_)));
        assert_eq!(ctx.messages.len(), 1);
        assert_eq!(ctx.token_sequences.len(), 1);
        // Sentiment ran through the same unavailable model and degraded.
        assert_eq!(ctx.sentiment_history.len(), 1);
        assert_eq!(ctx.sentiment_history[0].score, 0.0);
    }

    // ============================================================
    // Retrieval
    // ============================================================

    #[tokio::test]
    async fn test_retrieved_docs_enrich_prompt_and_history() {
        let llm = ScriptedLlm::new("O prazo é de 7 dias.");
        let docs = vec![
            RetrievedDoc::new("Reembolsos em até 7 dias.", "politicas.md", 0.91),
            RetrievedDoc::new("Frete grátis acima de R$ 100.", "frete.md", 0.6),
        ];
        let orch = ChatOrchestrator::new(ChatConfig::default(), retrieval_on(), llm.clone())
            .with_sentiment(Arc::new(DisabledSentiment))
            .with_retriever(Arc::new(StaticRetriever(docs)));
        let mut ctx = SessionContext::new("s1");

        let reply = orch
            .handle_user_message(&mut ctx, "Qual o prazo do reembolso?")
            .await
            .unwrap();

        assert_eq!(reply.documents.len(), 2);
        assert!(matches!(ctx.messages.last(), Some(ChatEntry::RagContext { docs }) if docs.len() == 2));

        let requests = llm.requests.lock().unwrap();
        let system = &requests[0].messages[0].content;
        assert!(system.contains("Fonte: politicas.md"));
        // Rag entries never reach the model.
        assert_eq!(requests[0].messages.len(), 2);
    }

    #[tokio::test]
    async fn test_retrieval_disabled_skips_retriever() {
        let llm = ScriptedLlm::new("ok");
        let orch = ChatOrchestrator::new(ChatConfig::default(), RetrievalConfig::default(), llm.clone())
            .with_sentiment(Arc::new(DisabledSentiment))
            .with_retriever(Arc::new(StaticRetriever(vec![RetrievedDoc::new("x", "y", 1.0)])));
        let mut ctx = SessionContext::new("s1");

        let reply = orch.handle_user_message(&mut ctx, "pedido").await.unwrap();
        assert!(reply.documents.is_empty());
        let requests = llm.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert!(!requests[0].messages[0].content.contains("BASE DE CONHECIMENTO"));
    }

    #[tokio::test]
    async fn test_retriever_failure_is_ignored() {
        let orch = ChatOrchestrator::new(ChatConfig::default(), retrieval_on(), ScriptedLlm::new("ok"))
            .with_retriever(Arc::new(BrokenRetriever));
        let mut ctx = SessionContext::new("s1");

        let reply = orch.handle_user_message(&mut ctx, "pedido").await.unwrap();
        assert_eq!(reply.answer, "ok");
        assert!(reply.documents.is_empty());
        assert_eq!(ctx.messages.len(), 2);
    }
}
