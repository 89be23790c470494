//! Conversational and channel-capture layer for VoxMap.
//!
//! Holds the per-session chat state, the orchestration of a user turn
//! (sentiment, retrieval, LLM reply), graph view selection over the session
//! corpus, and the capture of external channel events into the message store.

pub mod channel;
pub mod error;
pub mod graph_view;
pub mod llm;
pub mod orchestrator;
pub mod relay;
pub mod retrieval;
pub mod sentiment;
pub mod session;

pub use channel::{CaptureHandler, ChannelEvent, StreamKind};
pub use error::ChatError;
pub use graph_view::{select_graph_view, GraphSettings, GraphView};
pub use llm::{ChatRole, CompletionRequest, LlmClient, LlmMessage, UnavailableLlm};
pub use orchestrator::{ChatOrchestrator, ChatReply};
pub use relay::{run_relay, EventSource, EventStream, RelayStats};
pub use retrieval::{format_rag_context, NoRetrieval, RetrievedDoc, Retriever};
pub use sentiment::{DisabledSentiment, LlmSentimentClassifier, SentimentClassifier};
pub use session::{ChatEntry, SessionContext};
