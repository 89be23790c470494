//! Application state shared across all route handlers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use voxmap_analytics::{
    graph_renderer_from_name, word_cloud_renderer_from_name, GraphRenderer, RenderOptions,
    WordCloudRenderer,
};
use voxmap_chat::{ChatOrchestrator, LlmClient, SessionContext, UnavailableLlm};
use voxmap_core::config::VoxmapConfig;
use voxmap_storage::MessageStore;

/// Chat sessions held in memory, keyed by session id. Each context has its
/// own lock so turns of different sessions run concurrently.
pub type ChatSessions = Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<SessionContext>>>>>;

/// Shared application state.
///
/// All fields use `Arc` for cheap cloning across handler tasks.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<VoxmapConfig>,
    pub store: Arc<dyn MessageStore>,
    pub graph_renderer: Arc<dyn GraphRenderer>,
    pub word_cloud_renderer: Arc<dyn WordCloudRenderer>,
    pub orchestrator: Arc<ChatOrchestrator>,
    pub chat_sessions: ChatSessions,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Create the state, selecting renderers by the names in `config.render`.
    ///
    /// Chat replies need a model client; until one is attached with
    /// [`AppState::with_llm`] every chat turn fails as unavailable.
    pub fn new(config: VoxmapConfig, store: Arc<dyn MessageStore>) -> Self {
        let graph_renderer: Arc<dyn GraphRenderer> =
            Arc::from(graph_renderer_from_name(&config.render.graph));
        let word_cloud_renderer: Arc<dyn WordCloudRenderer> =
            Arc::from(word_cloud_renderer_from_name(&config.render.word_cloud));
        tracing::debug!(
            graph = graph_renderer.name(),
            word_cloud = word_cloud_renderer.name(),
            "Renderers selected"
        );
        let orchestrator = Arc::new(chat_orchestrator(&config, Arc::new(UnavailableLlm)));
        Self {
            config: Arc::new(config),
            store,
            graph_renderer,
            word_cloud_renderer,
            orchestrator,
            chat_sessions: Arc::new(Mutex::new(HashMap::new())),
            start_time: Instant::now(),
        }
    }

    /// Replace the model client used for chat replies and sentiment.
    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        tracing::debug!(llm = llm.name(), "Chat model client attached");
        self.orchestrator = Arc::new(chat_orchestrator(&self.config, llm));
        self
    }

    /// The chat context of `session_id`, created empty on first use.
    pub fn chat_session(&self, session_id: &str) -> Arc<tokio::sync::Mutex<SessionContext>> {
        let mut sessions = self
            .chat_sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            sessions
                .entry(session_id.to_string())
                .or_insert_with(|| {
                    Arc::new(tokio::sync::Mutex::new(SessionContext::new(session_id)))
                }),
        )
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            dark_mode: self.config.render.dark_mode,
            max_terms: self.config.render.word_cloud_terms,
            ..RenderOptions::default()
        }
    }
}

fn chat_orchestrator(config: &VoxmapConfig, llm: Arc<dyn LlmClient>) -> ChatOrchestrator {
    ChatOrchestrator::new(config.chat.clone(), config.retrieval.clone(), llm)
}
