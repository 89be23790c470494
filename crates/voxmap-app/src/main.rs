//! VoxMap application binary - composition root.
//!
//! 1. Parse the CLI and load configuration from TOML
//! 2. Initialize tracing
//! 3. Open the configured message store
//! 4. Run the requested subcommand: graph, ingest, capture or serve

mod cli;
mod tail;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::Notify;

use voxmap_analytics::{graph_renderer_from_name, tokenize, RenderOptions, RenderOutcome};
use voxmap_api::{start_server, AppState};
use voxmap_chat::{run_relay, select_graph_view, CaptureHandler, GraphSettings, GraphView};
use voxmap_core::config::VoxmapConfig;
use voxmap_core::types::NewQuestion;
use voxmap_core::Backoff;
use voxmap_storage::{open_store, session_token_sequences, MessageStore};

use cli::{CaptureArgs, CaptureMode, CliArgs, Command, GraphArgs, IngestArgs, OutputFormat, ServeArgs};
use tail::TailSource;

type AppResult = Result<(), Box<dyn std::error::Error>>;

/// How often a followed capture file is polled for new frames.
const TAIL_POLL: Duration = Duration::from_millis(500);

/// Expand ~ to home directory in a path string.
fn resolve_data_dir(data_dir: &str) -> PathBuf {
    if let Some(rest) = data_dir.strip_prefix("~/") {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(rest)
    } else {
        PathBuf::from(data_dir)
    }
}

fn init_tracing(cli_level: Option<&str>, config_level: &str) {
    let filter = match cli_level {
        Some(level) => tracing_subscriber::EnvFilter::new(level),
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config_level)),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> AppResult {
    let args = CliArgs::parse();

    // Config is read before tracing so its log level can apply.
    let config_file = args.resolve_config_path();
    let loaded = config_file
        .exists()
        .then(|| VoxmapConfig::load(&config_file));
    let config_level = match &loaded {
        Some(Ok(config)) => config.general.log_level.clone(),
        _ => "info".to_string(),
    };
    init_tracing(args.log_level.as_deref(), &config_level);

    tracing::info!("Starting VoxMap v{}", env!("CARGO_PKG_VERSION"));

    let config = match loaded {
        Some(Ok(config)) => {
            tracing::info!(path = %config_file.display(), "Configuration loaded");
            config
        }
        Some(Err(e)) => {
            tracing::warn!(path = %config_file.display(), error = %e, "Invalid configuration, using defaults");
            VoxmapConfig::default()
        }
        None => {
            tracing::info!(path = %config_file.display(), "No configuration file, using defaults");
            VoxmapConfig::default()
        }
    };

    // Storage.
    let data_dir = resolve_data_dir(&args.resolve_data_dir(&config.general.data_dir));
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::error!(path = %data_dir.display(), error = %e, "Failed to create data directory");
        return Err(e.into());
    }
    let store = open_store(&config.storage, &data_dir)?;
    tracing::info!(path = %data_dir.display(), backend = ?config.storage.backend, "Message store ready");

    match args.command {
        Command::Graph(graph) => run_graph(&config, store.as_ref(), graph),
        Command::Ingest(ingest) => run_ingest(store.as_ref(), ingest),
        Command::Capture(capture) => run_capture(&config, store, capture).await,
        Command::Serve(serve) => run_serve(config, store, serve).await,
    }
}

fn run_graph(config: &VoxmapConfig, store: &dyn MessageStore, args: GraphArgs) -> AppResult {
    let sequences = match (&args.input, &args.session) {
        (Some(path), _) => read_token_sequences(path)?,
        (None, Some(session)) => session_token_sequences(store, session)?,
        (None, None) => return Err("either --session or --input is required".into()),
    };

    let mut settings = GraphSettings::from_config(&config.graph)?;
    if let Some(weight) = args.min_edge_weight {
        settings.min_edge_weight = u64::from(weight.max(1));
    }
    if let Some(window) = args.window {
        settings.pairing = voxmap_analytics::PairingMode::from_window(window)?;
    }
    if let Some(depth) = args.max_depth {
        settings.max_depth = depth;
    }
    if args.all {
        settings.show_paths_only = false;
    }
    if let Some(target) = args.target {
        settings = settings.with_target(target);
    }

    let (graph, highlight) = match select_graph_view(&sequences, &settings) {
        GraphView::NoData => {
            println!("Sem dados para o grafo.");
            return Ok(());
        }
        GraphView::TargetNotFound(word) => {
            return Err(format!("word '{}' not found in the filtered graph", word).into());
        }
        GraphView::Graph { graph, highlight } => (graph, highlight),
    };

    match args.format {
        OutputFormat::Json => {
            let renderer = graph_renderer_from_name(&config.render.graph);
            let options = RenderOptions {
                dark_mode: config.render.dark_mode,
                ..RenderOptions::default()
            };
            match renderer.render(&graph, highlight.as_deref(), &options) {
                RenderOutcome::Rendered(doc) => println!("{}", serde_json::to_string_pretty(&doc)?),
                RenderOutcome::Empty(msg) | RenderOutcome::Unavailable(msg) => println!("{}", msg),
            }
        }
        OutputFormat::Text => {
            if let Some(target) = &highlight {
                println!("Target: {}", target);
            }
            println!("Nodes ({}):", graph.node_len());
            for (word, count) in graph.ranked_words(graph.node_len()) {
                println!("  {:<24} {}", word, count);
            }
            let mut edges: Vec<_> = graph.edges().collect();
            edges.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| (a.0, a.1).cmp(&(b.0, b.1))));
            println!("Edges ({}):", edges.len());
            for (a, b, weight) in edges {
                println!("  {} - {}  {}", a, b, weight);
            }
        }
    }
    Ok(())
}

fn read_token_sequences(path: &Path) -> Result<Vec<Vec<String>>, std::io::Error> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(tokenize)
        .filter(|tokens| !tokens.is_empty())
        .collect())
}

fn run_ingest(store: &dyn MessageStore, args: IngestArgs) -> AppResult {
    let content = std::fs::read_to_string(&args.file)?;
    let session = args.session.unwrap_or_else(|| args.user.clone());

    let questions: Vec<NewQuestion> = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|line| {
            NewQuestion::new(&args.user, &session, &args.channel, line)
                .with_normalized_text(tokenize(line).join(" "))
        })
        .collect();
    let stored = store.save_questions(questions)?.len();

    tracing::info!(file = %args.file.display(), session = %session, stored, "Ingest complete");
    println!("Stored {} messages in session '{}'.", stored, session);
    Ok(())
}

async fn run_capture(
    config: &VoxmapConfig,
    store: Arc<dyn MessageStore>,
    args: CaptureArgs,
) -> AppResult {
    let mut handler = match args.mode {
        CaptureMode::Agents => CaptureHandler::agents(store),
        CaptureMode::Tts => CaptureHandler::tts_stream(store),
    };

    if let Some(sent) = &args.sent {
        let recorded = record_sent(&handler, sent)?;
        tracing::info!(file = %sent.display(), recorded, "Outgoing messages recorded");
        println!("Recorded {} outgoing messages.", recorded);
    }

    if args.follow {
        let source = TailSource::new(&args.file, TAIL_POLL);
        let shutdown = Arc::new(Notify::new());
        let signal = Arc::clone(&shutdown);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupt received, stopping capture");
                signal.notify_one();
            }
        });

        let stats = run_relay(
            &source,
            &mut handler,
            Backoff::from_config(&config.relay),
            shutdown,
        )
        .await;
        println!("Captured {} of {} frames.", stats.saved, stats.frames);
        return Ok(());
    }

    let content = std::fs::read_to_string(&args.file)?;
    let mut frames = 0usize;
    let mut saved = 0usize;
    for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        frames += 1;
        if handler.handle_frame(line)?.is_some() {
            saved += 1;
        }
    }
    tracing::info!(file = %args.file.display(), channel = handler.channel(), frames, saved, "Capture complete");
    println!("Captured {} of {} frames.", saved, frames);
    Ok(())
}

fn record_sent(handler: &CaptureHandler, path: &Path) -> Result<usize, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)?;
    let mut recorded = 0usize;
    for line in content.lines() {
        if handler.record_outgoing(line)?.is_some() {
            recorded += 1;
        }
    }
    Ok(recorded)
}

async fn run_serve(config: VoxmapConfig, store: Arc<dyn MessageStore>, args: ServeArgs) -> AppResult {
    let port = args.resolve_port(config.general.port);
    let state = AppState::new(config, store);

    start_server(&args.host, port, state, async {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, shutting down");
        }
    })
    .await?;
    Ok(())
}
