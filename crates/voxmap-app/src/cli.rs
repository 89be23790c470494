//! CLI argument definitions for the VoxMap application.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// VoxMap: word graphs and word clouds over captured customer conversations.
#[derive(Parser, Debug)]
#[command(name = "voxmap", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Data directory for the message store.
    #[arg(short = 'd', long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the word co-occurrence graph of a session or a text file.
    Graph(GraphArgs),
    /// Store messages from a text file, one message per line.
    Ingest(IngestArgs),
    /// Store the user messages found in a file of channel event frames.
    Capture(CaptureArgs),
    /// Run the HTTP API (webhooks and session views).
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
pub struct GraphArgs {
    /// Stored session to analyze.
    #[arg(short = 's', long, conflicts_with = "input", required_unless_present = "input")]
    pub session: Option<String>,

    /// Text file to analyze instead of a stored session, one message per line.
    #[arg(short = 'i', long)]
    pub input: Option<PathBuf>,

    /// Word to highlight and expand from (defaults to the most frequent word).
    #[arg(short = 't', long)]
    pub target: Option<String>,

    #[arg(long)]
    pub min_edge_weight: Option<u32>,

    /// Sliding window size; 0 pairs every word of a message.
    #[arg(short = 'w', long)]
    pub window: Option<usize>,

    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Show the whole filtered graph instead of the words reachable from the target.
    #[arg(long)]
    pub all: bool,

    /// Output format.
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Ranked words and weighted edges.
    Text,
    /// The configured graph renderer's document.
    Json,
}

#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Text file with one message per line.
    pub file: PathBuf,

    #[arg(short = 'u', long, default_value = "cli")]
    pub user: String,

    /// Session id (defaults to the user id).
    #[arg(short = 's', long)]
    pub session: Option<String>,

    #[arg(long, default_value = voxmap_core::types::channel::CHAT_UI)]
    pub channel: String,
}

#[derive(Args, Debug)]
pub struct CaptureArgs {
    /// File of JSON event frames, one per line.
    pub file: PathBuf,

    /// Which event stream the frames come from.
    #[arg(short = 'm', long, value_enum, default_value_t = CaptureMode::Agents)]
    pub mode: CaptureMode,

    /// Keep reading frames appended to the file until interrupted.
    #[arg(long)]
    pub follow: bool,

    /// Text that was sent out on the text-to-speech stream, one message per line.
    #[arg(long)]
    pub sent: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum CaptureMode {
    /// Conversational agent events.
    Agents,
    /// Server frames of the text-to-speech stream.
    Tts,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// API server port.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Address to bind.
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > VOXMAP_CONFIG env var > ~/.voxmap/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("VOXMAP_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the data directory.
    ///
    /// Priority: --data-dir flag > config file value.
    pub fn resolve_data_dir(&self, config_data_dir: &str) -> String {
        self.data_dir
            .as_ref()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_else(|| config_data_dir.to_string())
    }
}

impl ServeArgs {
    /// Resolve the API server port.
    ///
    /// Priority: --port flag > VOXMAP_PORT env var > config file value > 8001.
    pub fn resolve_port(&self, config_port: u16) -> u16 {
        if let Some(p) = self.port {
            return p;
        }
        if let Ok(val) = std::env::var("VOXMAP_PORT") {
            if let Ok(p) = val.parse::<u16>() {
                return p;
            }
        }
        if config_port != 0 {
            return config_port;
        }
        8001
    }
}

/// Default config file path for the current user.
fn default_config_path() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".voxmap").join("config.toml");
    }
    PathBuf::from("config.toml")
}
