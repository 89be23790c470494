//! Optional presentation backends for word graphs and word clouds.
//!
//! Rendering is a capability, not a requirement: each backend sits behind a
//! trait with an "unavailable" implementation, and the concrete backend is
//! chosen by name from configuration at startup.

use serde_json::{json, Value};

use crate::frequency::WordFrequencies;
use crate::graph::WordGraph;

/// Graph backend that renders nothing.
pub const RENDERER_NONE: &str = "none";
/// vis-network style JSON document.
pub const RENDERER_VIS_JSON: &str = "vis-json";
/// Ranked term list with relative weights.
pub const RENDERER_FREQUENCY: &str = "frequency";

/// Largest extra width an edge gets from its weight.
const MAX_EDGE_BONUS: u64 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub dark_mode: bool,
    pub height_px: u32,
    /// Maximum number of word-cloud terms.
    pub max_terms: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            dark_mode: true,
            height_px: 600,
            max_terms: 100,
        }
    }
}

/// Result of a render request.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    Rendered(Value),
    /// Nothing to draw; the message is shown to the user instead.
    Empty(String),
    /// The backend is not available in this build or configuration.
    Unavailable(String),
}

impl RenderOutcome {
    pub fn is_rendered(&self) -> bool {
        matches!(self, Self::Rendered(_))
    }
}

/// Node diameter scaled by its count relative to the most frequent node.
pub fn node_size(count: u64, max_count: u64) -> f64 {
    let max = max_count.max(1) as f64;
    10.0 + 30.0 * (count as f64 / max)
}

/// Edge stroke width for a co-occurrence weight.
pub fn edge_width(weight: u64) -> u64 {
    1 + weight.min(MAX_EDGE_BONUS)
}

pub trait GraphRenderer: Send + Sync {
    fn name(&self) -> &str;

    fn render(
        &self,
        graph: &WordGraph,
        highlight: Option<&str>,
        options: &RenderOptions,
    ) -> RenderOutcome;
}

pub trait WordCloudRenderer: Send + Sync {
    fn name(&self) -> &str;

    fn render(&self, frequencies: &WordFrequencies, options: &RenderOptions) -> RenderOutcome;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableGraphRenderer;

impl GraphRenderer for UnavailableGraphRenderer {
    fn name(&self) -> &str {
        RENDERER_NONE
    }

    fn render(&self, _: &WordGraph, _: Option<&str>, _: &RenderOptions) -> RenderOutcome {
        RenderOutcome::Unavailable("Grafo indisponível: nenhum renderizador configurado.".into())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableWordCloud;

impl WordCloudRenderer for UnavailableWordCloud {
    fn name(&self) -> &str {
        RENDERER_NONE
    }

    fn render(&self, _: &WordFrequencies, _: &RenderOptions) -> RenderOutcome {
        RenderOutcome::Unavailable(
            "Nuvem de palavras indisponível: nenhum renderizador configurado.".into(),
        )
    }
}

/// Emits `{options, nodes, edges}` in the shape vis-network consumes.
#[derive(Debug, Default, Clone, Copy)]
pub struct VisJsonRenderer;

struct Palette {
    background: &'static str,
    font: &'static str,
    highlight: &'static str,
    normal: &'static str,
}

impl Palette {
    fn for_mode(dark_mode: bool) -> Self {
        if dark_mode {
            Self {
                background: "#0f172a",
                font: "#e5e7eb",
                highlight: "#34d399",
                normal: "#93c5fd",
            }
        } else {
            Self {
                background: "#ffffff",
                font: "#333333",
                highlight: "#10b981",
                normal: "#60a5fa",
            }
        }
    }
}

impl GraphRenderer for VisJsonRenderer {
    fn name(&self) -> &str {
        RENDERER_VIS_JSON
    }

    fn render(
        &self,
        graph: &WordGraph,
        highlight: Option<&str>,
        options: &RenderOptions,
    ) -> RenderOutcome {
        if graph.is_empty() {
            return RenderOutcome::Empty("Sem dados para o grafo.".into());
        }

        let palette = Palette::for_mode(options.dark_mode);
        let max_count = graph.max_count();

        let nodes: Vec<Value> = graph
            .nodes()
            .map(|(token, count)| {
                let color = if highlight == Some(token) {
                    palette.highlight
                } else {
                    palette.normal
                };
                json!({
                    "id": token,
                    "label": token,
                    "size": node_size(count, max_count),
                    "color": color,
                    "title": format!("{}<br/>freq: {}", token, count),
                })
            })
            .collect();

        let edges: Vec<Value> = graph
            .edges()
            .map(|(a, b, weight)| {
                json!({
                    "from": a,
                    "to": b,
                    "value": weight,
                    "width": edge_width(weight),
                    "title": format!("{} — {}<br/>coocorrências: {}", a, b, weight),
                })
            })
            .collect();

        RenderOutcome::Rendered(json!({
            "options": {
                "height": format!("{}px", options.height_px),
                "background": palette.background,
                "font_color": palette.font,
                "directed": false,
            },
            "highlight": highlight,
            "nodes": nodes,
            "edges": edges,
        }))
    }
}

/// Top terms with weights relative to the most frequent one.
#[derive(Debug, Default, Clone, Copy)]
pub struct FrequencyListCloud;

impl WordCloudRenderer for FrequencyListCloud {
    fn name(&self) -> &str {
        RENDERER_FREQUENCY
    }

    fn render(&self, frequencies: &WordFrequencies, options: &RenderOptions) -> RenderOutcome {
        let top = frequencies.top(options.max_terms);
        let Some(max) = top.first().map(|(_, c)| *c) else {
            return RenderOutcome::Empty("Digite algo para iniciar a nuvem de palavras.".into());
        };

        let terms: Vec<Value> = top
            .iter()
            .map(|(term, count)| {
                json!({
                    "term": term,
                    "count": count,
                    "weight": *count as f64 / max as f64,
                })
            })
            .collect();

        RenderOutcome::Rendered(json!({
            "total": frequencies.total(),
            "terms": terms,
        }))
    }
}

/// Graph backend for a configured name. Unknown names fall back to the
/// unavailable renderer.
pub fn graph_renderer_from_name(name: &str) -> Box<dyn GraphRenderer> {
    match name.trim().to_lowercase().as_str() {
        RENDERER_VIS_JSON => Box::new(VisJsonRenderer),
        RENDERER_NONE | "" => Box::new(UnavailableGraphRenderer),
        other => {
            tracing::warn!(renderer = other, "Unknown graph renderer, rendering disabled");
            Box::new(UnavailableGraphRenderer)
        }
    }
}

/// Word-cloud backend for a configured name. Unknown names fall back to the
/// unavailable renderer.
pub fn word_cloud_renderer_from_name(name: &str) -> Box<dyn WordCloudRenderer> {
    match name.trim().to_lowercase().as_str() {
        RENDERER_FREQUENCY => Box::new(FrequencyListCloud),
        RENDERER_NONE | "" => Box::new(UnavailableWordCloud),
        other => {
            tracing::warn!(renderer = other, "Unknown word cloud renderer, rendering disabled");
            Box::new(UnavailableWordCloud)
        }
    }
}
