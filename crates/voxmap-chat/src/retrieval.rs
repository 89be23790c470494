//! Knowledge-base retrieval interface and prompt context formatting.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ChatError;

/// Characters of document text kept in the prompt context.
const MAX_DOC_CHARS: usize = 500;

/// A document returned by the knowledge base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDoc {
    pub text: String,
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default = "default_category")]
    pub category: String,
    /// Relevance in [0, 1].
    #[serde(default)]
    pub score: f32,
}

fn default_source() -> String {
    "Desconhecido".to_string()
}

fn default_category() -> String {
    "geral".to_string()
}

impl RetrievedDoc {
    pub fn new(text: impl Into<String>, source: impl Into<String>, score: f32) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
            category: default_category(),
            score,
        }
    }
}

#[async_trait]
pub trait Retriever: Send + Sync {
    /// At most `top_k` documents scoring at least `score_threshold`.
    async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        score_threshold: f32,
    ) -> Result<Vec<RetrievedDoc>, ChatError>;
}

/// Retriever for deployments without a knowledge base.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRetrieval;

#[async_trait]
impl Retriever for NoRetrieval {
    async fn retrieve(&self, _: &str, _: usize, _: f32) -> Result<Vec<RetrievedDoc>, ChatError> {
        Ok(Vec::new())
    }
}

/// Render documents as the knowledge-base block appended to the system
/// prompt. Returns an empty string when there are no documents.
pub fn format_rag_context(docs: &[RetrievedDoc]) -> String {
    if docs.is_empty() {
        return String::new();
    }

    let parts: Vec<String> = docs
        .iter()
        .map(|doc| {
            format!(
                "\n📄 Fonte: {} | Categoria: {} | Relevância: {:.1}%\n{}\n---\n",
                doc.source,
                doc.category,
                doc.score * 100.0,
                truncate_chars(&doc.text, MAX_DOC_CHARS)
            )
        })
        .collect();

    format!(
        "\n\n[INFORMAÇÕES DA BASE DE CONHECIMENTO]:\n{}\n\nUse estas informações para fundamentar sua resposta quando relevante.\n",
        parts.join("\n")
    )
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
