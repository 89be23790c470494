//! VoxMap Analytics crate - word statistics over captured conversations.
//!
//! Provides the text-analysis pipeline used by the chat and channel views:
//! - Portuguese content-word tokenization
//! - Word co-occurrence graphs with edge filtering
//! - Depth-bounded reachable subgraphs around a target word
//! - Word-cloud frequencies
//! - Sentiment reply parsing and scoring
//! - Optional renderers for graphs and word clouds

pub mod error;
pub mod frequency;
pub mod graph;
pub mod reachability;
pub mod render;
pub mod sentiment;
pub mod tokenizer;

pub use error::AnalyticsError;
pub use frequency::WordFrequencies;
pub use graph::{build_graph, EdgeKey, PairingMode, WordGraph};
pub use reachability::extract_reachable;
pub use render::{
    edge_width, graph_renderer_from_name, node_size, word_cloud_renderer_from_name,
    FrequencyListCloud, GraphRenderer,
    RenderOptions, RenderOutcome, UnavailableGraphRenderer, UnavailableWordCloud, VisJsonRenderer,
    WordCloudRenderer,
};
pub use sentiment::{
    parse_sentiment, score_from_label, sentiment_prompt, SentimentLabel, SentimentPoint,
    SentimentResult,
};
pub use tokenizer::{is_stop_word, tokenize};
