//! Word co-occurrence graph.
//!
//! Nodes are tokens carrying an occurrence `count`; edges are unordered pairs
//! of distinct tokens carrying a co-occurrence `weight`. Ordered maps keep
//! iteration (and therefore rendering) deterministic.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;

// =============================================================================
// PairingMode
// =============================================================================

/// Which token pairs inside a message count as a co-occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairingMode {
    /// Every pair of positions within the same message.
    FullMessage,
    /// Pairs `(i, j)` with `i < j < i + k`; `k = 2` is bigram adjacency.
    SlidingWindow(usize),
}

impl PairingMode {
    /// Sliding window of `k` tokens. Rejects `k < 2`, which could never pair
    /// anything.
    pub fn sliding(k: usize) -> Result<Self, AnalyticsError> {
        if k < 2 {
            return Err(AnalyticsError::InvalidWindow(k));
        }
        Ok(PairingMode::SlidingWindow(k))
    }

    /// Map the configuration encoding: `0` is full-message mode, anything
    /// else is a window size.
    pub fn from_window(window: usize) -> Result<Self, AnalyticsError> {
        if window == 0 {
            Ok(PairingMode::FullMessage)
        } else {
            Self::sliding(window)
        }
    }

    /// Exclusive upper bound of partner positions for position `i`.
    fn horizon(&self, i: usize, len: usize) -> usize {
        match *self {
            PairingMode::FullMessage => len,
            PairingMode::SlidingWindow(k) => i.saturating_add(k).min(len),
        }
    }
}

impl Default for PairingMode {
    fn default() -> Self {
        PairingMode::SlidingWindow(2)
    }
}

// =============================================================================
// EdgeKey
// =============================================================================

/// Canonical key of an undirected edge: endpoints stored in sorted order, so
/// `(a, b)` and `(b, a)` name the same edge.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeKey {
    low: String,
    high: String,
}

impl EdgeKey {
    /// Returns `None` for a self-loop.
    pub fn new(a: &str, b: &str) -> Option<Self> {
        match a.cmp(b) {
            std::cmp::Ordering::Less => Some(Self {
                low: a.to_string(),
                high: b.to_string(),
            }),
            std::cmp::Ordering::Greater => Some(Self {
                low: b.to_string(),
                high: a.to_string(),
            }),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn endpoints(&self) -> (&str, &str) {
        (&self.low, &self.high)
    }

    pub fn contains(&self, node: &str) -> bool {
        self.low == node || self.high == node
    }
}

// =============================================================================
// WordGraph
// =============================================================================

/// Undirected weighted word graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordGraph {
    nodes: BTreeMap<String, u64>,
    edges: BTreeMap<EdgeKey, u64>,
    adjacency: BTreeMap<String, BTreeSet<String>>,
}

impl WordGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one occurrence of `token`.
    pub fn add_occurrence(&mut self, token: &str) {
        *self.nodes.entry(token.to_string()).or_insert(0) += 1;
    }

    /// Register one co-occurrence of `a` and `b`.
    ///
    /// Self-pairs are ignored and return `false`. Missing endpoints are
    /// created with a count of zero.
    pub fn add_cooccurrence(&mut self, a: &str, b: &str) -> bool {
        let Some(key) = EdgeKey::new(a, b) else {
            return false;
        };
        let weight = self.edges.get(&key).copied().unwrap_or(0) + 1;
        self.insert_edge(key, weight);
        true
    }

    /// Accumulate one message: count every token, then pair tokens under
    /// `mode`. Sequences with fewer than two tokens only contribute counts.
    pub fn accumulate(&mut self, tokens: &[String], mode: PairingMode) {
        for token in tokens {
            self.add_occurrence(token);
        }
        for i in 0..tokens.len() {
            for j in (i + 1)..mode.horizon(i, tokens.len()) {
                self.add_cooccurrence(&tokens[i], &tokens[j]);
            }
        }
    }

    /// Derived copy keeping every node and only edges with
    /// `weight >= min_edge_weight`.
    pub fn filter_edges(&self, min_edge_weight: u64) -> WordGraph {
        let mut filtered = WordGraph {
            nodes: self.nodes.clone(),
            ..WordGraph::default()
        };
        for (key, &weight) in &self.edges {
            if weight >= min_edge_weight {
                filtered.insert_edge(key.clone(), weight);
            }
        }
        filtered
    }

    /// Subgraph induced on `keep`: those nodes (with their counts) that exist
    /// in this graph, and every edge whose endpoints are both kept.
    pub fn induced_subgraph(&self, keep: &BTreeSet<String>) -> WordGraph {
        let mut sub = WordGraph::default();
        for (token, &count) in &self.nodes {
            if keep.contains(token) {
                sub.nodes.insert(token.clone(), count);
            }
        }
        for (key, &weight) in &self.edges {
            let (a, b) = key.endpoints();
            if keep.contains(a) && keep.contains(b) {
                sub.insert_edge(key.clone(), weight);
            }
        }
        sub
    }

    fn insert_edge(&mut self, key: EdgeKey, weight: u64) {
        let (a, b) = key.endpoints();
        self.nodes.entry(a.to_string()).or_insert(0);
        self.nodes.entry(b.to_string()).or_insert(0);
        self.adjacency
            .entry(a.to_string())
            .or_default()
            .insert(b.to_string());
        self.adjacency
            .entry(b.to_string())
            .or_default()
            .insert(a.to_string());
        self.edges.insert(key, weight);
    }

    pub fn contains_node(&self, token: &str) -> bool {
        self.nodes.contains_key(token)
    }

    pub fn node_count(&self, token: &str) -> Option<u64> {
        self.nodes.get(token).copied()
    }

    /// Weight of the edge between `a` and `b`, in either order.
    pub fn edge_weight(&self, a: &str, b: &str) -> Option<u64> {
        EdgeKey::new(a, b).and_then(|key| self.edges.get(&key).copied())
    }

    pub fn neighbors<'a>(&'a self, token: &str) -> impl Iterator<Item = &'a str> + 'a {
        self.adjacency
            .get(token)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// Nodes with their counts, in token order.
    pub fn nodes(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.nodes.iter().map(|(t, &c)| (t.as_str(), c))
    }

    /// Edges as `(low, high, weight)`, in key order.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, u64)> + '_ {
        self.edges.iter().map(|(k, &w)| {
            let (a, b) = k.endpoints();
            (a, b, w)
        })
    }

    pub fn node_len(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn max_count(&self) -> u64 {
        self.nodes.values().copied().max().unwrap_or(0)
    }

    /// Tokens by descending count, ties broken alphabetically.
    pub fn ranked_words(&self, limit: usize) -> Vec<(String, u64)> {
        let mut ranked: Vec<(String, u64)> =
            self.nodes.iter().map(|(t, &c)| (t.clone(), c)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(limit);
        ranked
    }
}

/// Build a co-occurrence graph from per-message token sequences and drop
/// edges lighter than `min_edge_weight`. Nodes are never dropped.
pub fn build_graph<I, S>(sequences: I, mode: PairingMode, min_edge_weight: u64) -> WordGraph
where
    I: IntoIterator<Item = S>,
    S: AsRef<[String]>,
{
    let mut graph = WordGraph::new();
    let mut messages = 0usize;
    for seq in sequences {
        graph.accumulate(seq.as_ref(), mode);
        messages += 1;
    }
    let filtered = graph.filter_edges(min_edge_weight);
    tracing::debug!(
        messages,
        nodes = filtered.node_len(),
        edges = filtered.edge_len(),
        dropped_edges = graph.edge_len() - filtered.edge_len(),
        "Word graph built"
    );
    filtered
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    fn animals() -> Vec<Vec<String>> {
        vec![
            seq(&["gato", "cachorro"]),
            seq(&["gato", "passaro"]),
            seq(&["cachorro", "passaro"]),
        ]
    }

    #[test]
    fn test_full_message_scenario() {
        let g = build_graph(animals(), PairingMode::FullMessage, 1);
        assert_eq!(g.node_count("gato"), Some(2));
        assert_eq!(g.node_count("cachorro"), Some(2));
        assert_eq!(g.node_count("passaro"), Some(2));
        assert_eq!(g.edge_len(), 3);
        assert_eq!(g.edge_weight("gato", "cachorro"), Some(1));
        assert_eq!(g.edge_weight("gato", "passaro"), Some(1));
        assert_eq!(g.edge_weight("cachorro", "passaro"), Some(1));
    }

    #[test]
    fn test_full_message_pairs_all_positions() {
        let g = build_graph(
            vec![seq(&["entrega", "atraso", "pedido", "reembolso"])],
            PairingMode::FullMessage,
            1,
        );
        // n * (n - 1) / 2 distinct pairs.
        assert_eq!(g.edge_len(), 6);
        assert_eq!(g.edge_weight("entrega", "reembolso"), Some(1));
    }

    #[test]
    fn test_sliding_window_limits_pairs() {
        let tokens = vec![seq(&["um1", "dois", "tres", "quatro"])];
        let bigram = build_graph(tokens.clone(), PairingMode::SlidingWindow(2), 1);
        assert_eq!(bigram.edge_len(), 3);
        assert_eq!(bigram.edge_weight("um1", "dois"), Some(1));
        assert_eq!(bigram.edge_weight("um1", "tres"), None);

        let trigram = build_graph(tokens, PairingMode::SlidingWindow(3), 1);
        assert_eq!(trigram.edge_len(), 5);
        assert_eq!(trigram.edge_weight("um1", "tres"), Some(1));
        assert_eq!(trigram.edge_weight("um1", "quatro"), None);
    }

    #[test]
    fn test_window_larger_than_message_equals_full_mode() {
        let tokens = vec![seq(&["alfa", "beta", "gama"])];
        let wide = build_graph(tokens.clone(), PairingMode::SlidingWindow(10), 1);
        let full = build_graph(tokens, PairingMode::FullMessage, 1);
        assert_eq!(wide, full);
    }

    #[test]
    fn test_singleton_and_empty_sequences_still_count() {
        let g = build_graph(
            vec![seq(&["boleto"]), seq(&[]), seq(&["boleto"])],
            PairingMode::FullMessage,
            1,
        );
        assert_eq!(g.node_count("boleto"), Some(2));
        assert_eq!(g.edge_len(), 0);
        assert_eq!(g.node_len(), 1);
    }

    #[test]
    fn test_no_self_loops() {
        let g = build_graph(
            vec![seq(&["fatura", "fatura", "boleto", "fatura"])],
            PairingMode::FullMessage,
            1,
        );
        assert_eq!(g.edge_weight("fatura", "fatura"), None);
        assert_eq!(g.node_count("fatura"), Some(3));
        // (fatura, boleto) observed at positions (0,2), (1,2), (2,3).
        assert_eq!(g.edge_weight("fatura", "boleto"), Some(3));
        assert!(g.neighbors("fatura").all(|n| n != "fatura"));
    }

    #[test]
    fn test_edges_are_symmetric() {
        let g = build_graph(
            vec![seq(&["pix", "cartao"]), seq(&["cartao", "pix"])],
            PairingMode::SlidingWindow(2),
            1,
        );
        assert_eq!(g.edge_weight("pix", "cartao"), Some(2));
        assert_eq!(g.edge_weight("cartao", "pix"), Some(2));
        assert_eq!(g.edge_len(), 1);
        assert_eq!(EdgeKey::new("pix", "cartao"), EdgeKey::new("cartao", "pix"));
    }

    #[test]
    fn test_build_is_idempotent() {
        let a = build_graph(animals(), PairingMode::FullMessage, 1);
        let b = build_graph(animals(), PairingMode::FullMessage, 1);
        assert_eq!(a, b);
    }

    #[test]
    fn test_filter_drops_light_edges_but_keeps_nodes() {
        let sequences = vec![
            seq(&["troca", "produto"]),
            seq(&["troca", "produto"]),
            seq(&["produto", "defeito"]),
        ];
        let g = build_graph(sequences, PairingMode::SlidingWindow(2), 2);
        assert_eq!(g.edge_len(), 1);
        assert_eq!(g.edge_weight("troca", "produto"), Some(2));
        assert_eq!(g.edge_weight("produto", "defeito"), None);
        assert_eq!(g.node_count("defeito"), Some(1));
        assert_eq!(g.neighbors("defeito").count(), 0);
    }

    #[test]
    fn test_filter_is_monotone() {
        let sequences = vec![
            seq(&["a1a", "b2b", "c3c", "a1a", "b2b"]),
            seq(&["a1a", "b2b"]),
            seq(&["c3c", "d4d"]),
        ];
        let base = build_graph(sequences, PairingMode::FullMessage, 1);
        let mut previous = usize::MAX;
        for min in 1..=6 {
            let edges = base.filter_edges(min).edge_len();
            assert!(edges <= previous, "threshold {} increased edges", min);
            previous = edges;
        }
    }

    #[test]
    fn test_filter_does_not_mutate_source() {
        let g = build_graph(animals(), PairingMode::FullMessage, 1);
        let filtered = g.filter_edges(5);
        assert_eq!(filtered.edge_len(), 0);
        assert_eq!(g.edge_len(), 3);
    }

    #[test]
    fn test_pairing_mode_validation() {
        assert!(matches!(
            PairingMode::sliding(1),
            Err(AnalyticsError::InvalidWindow(1))
        ));
        assert!(PairingMode::sliding(0).is_err());
        assert_eq!(
            PairingMode::sliding(4).unwrap(),
            PairingMode::SlidingWindow(4)
        );
        assert_eq!(
            PairingMode::from_window(0).unwrap(),
            PairingMode::FullMessage
        );
        assert!(PairingMode::from_window(1).is_err());
    }

    #[test]
    fn test_ranked_words_orders_by_count_then_token() {
        let g = build_graph(
            vec![
                seq(&["zebra", "abacaxi"]),
                seq(&["zebra", "banana"]),
                seq(&["banana"]),
            ],
            PairingMode::FullMessage,
            1,
        );
        let ranked = g.ranked_words(10);
        assert_eq!(
            ranked,
            vec![
                ("banana".to_string(), 2),
                ("zebra".to_string(), 2),
                ("abacaxi".to_string(), 1),
            ]
        );
        assert_eq!(g.ranked_words(1).len(), 1);
        assert_eq!(g.max_count(), 2);
    }

    #[test]
    fn test_induced_subgraph_keeps_only_internal_edges() {
        let g = build_graph(animals(), PairingMode::FullMessage, 1);
        let keep: BTreeSet<String> = ["gato", "cachorro"].iter().map(|s| s.to_string()).collect();
        let sub = g.induced_subgraph(&keep);
        assert_eq!(sub.node_len(), 2);
        assert_eq!(sub.edge_len(), 1);
        assert_eq!(sub.node_count("gato"), Some(2));
        assert_eq!(sub.edge_weight("gato", "cachorro"), Some(1));
    }
}
