//! Selects the word graph shown for a session.

use voxmap_analytics::{build_graph, extract_reachable, AnalyticsError, PairingMode, WordGraph};
use voxmap_core::config::GraphConfig;

/// User-facing graph controls.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphSettings {
    pub min_edge_weight: u64,
    pub pairing: PairingMode,
    pub max_depth: usize,
    pub show_paths_only: bool,
    /// Word to highlight and expand from; defaults to the most frequent word.
    pub target: Option<String>,
}

impl GraphSettings {
    pub fn from_config(config: &GraphConfig) -> Result<Self, AnalyticsError> {
        Ok(Self {
            min_edge_weight: u64::from(config.min_edge_weight.max(1)),
            pairing: PairingMode::from_window(config.window)?,
            max_depth: config.max_depth,
            show_paths_only: config.show_paths_only,
            target: None,
        })
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            min_edge_weight: 1,
            pairing: PairingMode::default(),
            max_depth: 4,
            show_paths_only: true,
            target: None,
        }
    }
}

/// What the graph panel should display.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphView {
    /// No co-occurrence data yet.
    NoData,
    /// The requested word is absent from the filtered graph.
    TargetNotFound(String),
    Graph {
        graph: WordGraph,
        highlight: Option<String>,
    },
}

/// Build the filtered graph for `sequences` and apply the target
/// selection in `settings`.
pub fn select_graph_view(sequences: &[Vec<String>], settings: &GraphSettings) -> GraphView {
    let full = build_graph(sequences, settings.pairing, settings.min_edge_weight);
    if full.is_empty() {
        return GraphView::NoData;
    }

    let target = match &settings.target {
        Some(t) => t.trim().to_lowercase(),
        None => match full.ranked_words(1).into_iter().next() {
            Some((word, _)) => word,
            None => return GraphView::NoData,
        },
    };

    if !settings.show_paths_only {
        let highlight = full.contains_node(&target).then_some(target);
        return GraphView::Graph {
            graph: full,
            highlight,
        };
    }

    match extract_reachable(&full, &target, settings.max_depth) {
        Some(graph) => GraphView::Graph {
            graph,
            highlight: Some(target),
        },
        None => GraphView::TargetNotFound(target),
    }
}
