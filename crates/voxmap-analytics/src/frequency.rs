//! Word frequencies for the word cloud.

use std::collections::HashMap;

use crate::tokenizer::tokenize;

/// Token occurrence counts over a corpus.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordFrequencies {
    counts: HashMap<String, u64>,
    total: u64,
}

impl WordFrequencies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count tokens from already tokenized messages.
    pub fn from_sequences<I, S>(sequences: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[String]>,
    {
        let mut freq = Self::new();
        for seq in sequences {
            for token in seq.as_ref() {
                freq.add(token);
            }
        }
        freq
    }

    /// Tokenize raw corpus text and count the result.
    pub fn from_corpus_text(text: &str) -> Self {
        let mut freq = Self::new();
        for token in tokenize(text) {
            freq.add(&token);
        }
        freq
    }

    pub fn add(&mut self, token: &str) {
        *self.counts.entry(token.to_string()).or_insert(0) += 1;
        self.total += 1;
    }

    pub fn count(&self, token: &str) -> u64 {
        self.counts.get(token).copied().unwrap_or(0)
    }

    /// Total token occurrences.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Number of distinct tokens.
    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// The `n` most frequent tokens, ties broken alphabetically.
    pub fn top(&self, n: usize) -> Vec<(String, u64)> {
        let mut ranked: Vec<(String, u64)> =
            self.counts.iter().map(|(t, &c)| (t.clone(), c)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(n);
        ranked
    }
}
