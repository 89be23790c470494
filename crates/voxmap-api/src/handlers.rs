//! Route handler functions for all API endpoints.
//!
//! Each handler extracts query/path parameters via axum extractors,
//! interacts with AppState services, and returns JSON responses.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use voxmap_analytics::{tokenize, PairingMode, RenderOutcome, SentimentResult, WordFrequencies};
use voxmap_chat::{select_graph_view, ChatError, GraphSettings, GraphView, RetrievedDoc};
use voxmap_core::types::{channel, MessageRecord, NewQuestion};
use voxmap_storage::{session_token_sequences, SessionSummary};

use crate::error::ApiError;
use crate::state::AppState;

/// Upper bound for `?limit=` on the word-cloud route.
const MAX_WORD_CLOUD_TERMS: usize = 500;

// =============================================================================
// Query parameter types
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct GraphParams {
    pub min_edge_weight: Option<u32>,
    /// 0 pairs every token of a message; otherwise the sliding window size.
    pub window: Option<usize>,
    pub max_depth: Option<usize>,
    pub paths_only: Option<bool>,
    pub target: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WordCloudParams {
    pub limit: Option<usize>,
}

/// Body accepted by the channel webhooks. Every field is optional so that
/// a missing `text` is reported as such rather than as a decode failure.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookRequest {
    pub text: Option<String>,
    pub user: Option<String>,
    pub session: Option<String>,
}

/// Body of a chat turn. `user` defaults to the session id.
#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    pub user: Option<String>,
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qid: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GraphResponse {
    pub session_id: String,
    /// Highlighted word, when one is present in the graph.
    pub target: Option<String>,
    pub node_count: usize,
    pub edge_count: usize,
    /// Renderer output; absent when the renderer had nothing to draw.
    pub document: Option<serde_json::Value>,
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TermCount {
    pub term: String,
    pub count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WordCloudResponse {
    pub session_id: String,
    pub total: u64,
    pub distinct: usize,
    pub terms: Vec<TermCount>,
    pub document: Option<serde_json::Value>,
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub session_id: String,
    pub messages: Vec<MessageRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub session_id: String,
    /// Id of the stored user message.
    pub qid: Uuid,
    pub answer: String,
    pub sentiment: Option<SentimentResult>,
    pub documents: Vec<RetrievedDoc>,
    pub user_messages: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionsResponse {
    pub sessions: Vec<SessionSummary>,
}

// =============================================================================
// Handler functions
// =============================================================================

/// GET /health - health check.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// POST /webhook/elevenlabs - store a message posted by the voice agent.
pub async fn webhook_elevenlabs(
    State(state): State<AppState>,
    body: Bytes,
) -> (StatusCode, Json<WebhookResponse>) {
    capture_webhook(&state, channel::ELEVEN_WEBHOOK, &body)
}

/// POST /webhook/whatsapp - store a message relayed from WhatsApp.
pub async fn webhook_whatsapp(
    State(state): State<AppState>,
    body: Bytes,
) -> (StatusCode, Json<WebhookResponse>) {
    capture_webhook(&state, channel::WHATSAPP, &body)
}

fn capture_webhook(
    state: &AppState,
    channel: &str,
    body: &[u8],
) -> (StatusCode, Json<WebhookResponse>) {
    // An unreadable body is treated like an empty one.
    let request: WebhookRequest = serde_json::from_slice(body).unwrap_or_default();

    let Some(text) = request.text.filter(|t| !t.trim().is_empty()) else {
        return webhook_failure(StatusCode::BAD_REQUEST, "missing text");
    };
    let user = request
        .user
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| "anonymous".to_string());
    let session = request
        .session
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| user.clone());

    let normalized = tokenize(&text).join(" ");
    let question = NewQuestion::new(user, session, channel, text).with_normalized_text(normalized);
    match state.store.save_question(question) {
        Ok(qid) => {
            tracing::info!(channel, qid = %qid, "Webhook message stored");
            (
                StatusCode::OK,
                Json(WebhookResponse {
                    ok: true,
                    qid: Some(qid),
                    error: None,
                }),
            )
        }
        Err(e) => {
            tracing::error!(channel, error = %e, "Failed to store webhook message");
            webhook_failure(StatusCode::INTERNAL_SERVER_ERROR, "storage failure")
        }
    }
}

fn webhook_failure(status: StatusCode, error: &str) -> (StatusCode, Json<WebhookResponse>) {
    (
        status,
        Json(WebhookResponse {
            ok: false,
            qid: None,
            error: Some(error.to_string()),
        }),
    )
}

/// GET /sessions - sessions ordered by most recent activity.
pub async fn list_sessions(
    State(state): State<AppState>,
) -> Result<Json<SessionsResponse>, ApiError> {
    let sessions = state.store.list_sessions()?;
    Ok(Json(SessionsResponse { sessions }))
}

/// GET /sessions/{id}/messages - stored records of a session, oldest first.
pub async fn session_messages(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<MessagesResponse>, ApiError> {
    let messages = state.store.get_session(&session_id)?;
    Ok(Json(MessagesResponse {
        session_id,
        messages,
    }))
}

/// POST /sessions/{id}/chat - run one chat turn and store the user message.
///
/// The message is stored even when the model cannot answer; responds 503
/// when no model client is configured.
pub async fn session_chat(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let session = state.chat_session(&session_id);
    let mut ctx = session.lock().await;

    let result = match state
        .orchestrator
        .handle_user_message(&mut ctx, &request.message)
        .await
    {
        // Rejected messages are not stored.
        Err(err @ (ChatError::EmptyMessage | ChatError::MessageTooLong(_))) => {
            return Err(err.into())
        }
        other => other,
    };

    let text = request.message.trim();
    let user = request
        .user
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| session_id.clone());
    let question = NewQuestion::new(user, session_id.as_str(), channel::CHAT_UI, text)
        .with_normalized_text(tokenize(text).join(" "));
    let qid = state.store.save_question(question)?;

    let reply = result?;
    Ok(Json(ChatResponse {
        session_id,
        qid,
        answer: reply.answer,
        sentiment: reply.sentiment,
        documents: reply.documents,
        user_messages: ctx.user_message_count(),
    }))
}

/// GET /sessions/{id}/graph - word co-occurrence graph of a session.
///
/// Query parameters override the configured graph defaults. Responds 404
/// when a reachable view is requested around a word the filtered graph
/// does not contain.
pub async fn session_graph(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(params): Query<GraphParams>,
) -> Result<Json<GraphResponse>, ApiError> {
    let settings = graph_settings(&state, params)?;
    let sequences = session_token_sequences(state.store.as_ref(), &session_id)?;

    let (graph, highlight) = match select_graph_view(&sequences, &settings) {
        GraphView::NoData => {
            return Ok(Json(GraphResponse {
                session_id,
                target: None,
                node_count: 0,
                edge_count: 0,
                document: None,
                message: Some("Sem dados para o grafo.".to_string()),
            }));
        }
        GraphView::TargetNotFound(word) => {
            return Err(ApiError::NotFound(format!(
                "Palavra '{}' não encontrada no grafo filtrado.",
                word
            )));
        }
        GraphView::Graph { graph, highlight } => (graph, highlight),
    };

    let (document, message) = split_outcome(state.graph_renderer.render(
        &graph,
        highlight.as_deref(),
        &state.render_options(),
    ));

    Ok(Json(GraphResponse {
        session_id,
        target: highlight,
        node_count: graph.node_len(),
        edge_count: graph.edge_len(),
        document,
        message,
    }))
}

/// GET /sessions/{id}/wordcloud - most frequent content words of a session.
pub async fn session_word_cloud(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(params): Query<WordCloudParams>,
) -> Result<Json<WordCloudResponse>, ApiError> {
    let limit = params
        .limit
        .unwrap_or(state.config.render.word_cloud_terms)
        .clamp(1, MAX_WORD_CLOUD_TERMS);

    let sequences = session_token_sequences(state.store.as_ref(), &session_id)?;
    let frequencies = WordFrequencies::from_sequences(&sequences);

    let options = voxmap_analytics::RenderOptions {
        max_terms: limit,
        ..state.render_options()
    };
    let (document, message) =
        split_outcome(state.word_cloud_renderer.render(&frequencies, &options));

    let terms = frequencies
        .top(limit)
        .into_iter()
        .map(|(term, count)| TermCount { term, count })
        .collect();

    Ok(Json(WordCloudResponse {
        session_id,
        total: frequencies.total(),
        distinct: frequencies.distinct(),
        terms,
        document,
        message,
    }))
}

fn graph_settings(state: &AppState, params: GraphParams) -> Result<GraphSettings, ApiError> {
    let mut settings = GraphSettings::from_config(&state.config.graph)?;

    if let Some(weight) = params.min_edge_weight {
        if weight == 0 {
            return Err(ApiError::BadRequest(
                "min_edge_weight must be at least 1".to_string(),
            ));
        }
        settings.min_edge_weight = u64::from(weight);
    }
    if let Some(window) = params.window {
        settings.pairing = PairingMode::from_window(window)?;
    }
    if let Some(depth) = params.max_depth {
        settings.max_depth = depth;
    }
    if let Some(paths_only) = params.paths_only {
        settings.show_paths_only = paths_only;
    }
    if let Some(target) = params.target.filter(|t| !t.trim().is_empty()) {
        settings = settings.with_target(target);
    }
    Ok(settings)
}

fn split_outcome(outcome: RenderOutcome) -> (Option<serde_json::Value>, Option<String>) {
    match outcome {
        RenderOutcome::Rendered(doc) => (Some(doc), None),
        RenderOutcome::Empty(msg) | RenderOutcome::Unavailable(msg) => (None, Some(msg)),
    }
}
