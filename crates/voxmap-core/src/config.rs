use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, VoxmapError};

/// Top-level configuration for VoxMap.
///
/// Loaded from `~/.voxmap/config.toml` by default. Each section corresponds
/// to one subsystem.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoxmapConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub relay: RelayConfig,
}

impl VoxmapConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: VoxmapConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.graph.min_edge_weight < 1 {
            return Err(VoxmapError::Config(
                "graph.min_edge_weight must be at least 1".to_string(),
            ));
        }
        if self.graph.window == 1 {
            return Err(VoxmapError::Config(
                "graph.window must be 0 (whole message) or at least 2".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.retrieval.score_threshold) {
            return Err(VoxmapError::Config(format!(
                "retrieval.score_threshold must be within [0, 1], got {}",
                self.retrieval.score_threshold
            )));
        }
        if self.relay.initial_backoff_secs == 0
            || self.relay.max_backoff_secs < self.relay.initial_backoff_secs
        {
            return Err(VoxmapError::Config(
                "relay backoff must satisfy 0 < initial_backoff_secs <= max_backoff_secs"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory for the message store.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// HTTP port for `voxmap serve`.
    pub port: u16,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.voxmap/data".to_string(),
            log_level: "info".to_string(),
            port: 8001,
        }
    }
}

/// Which message store implementation to open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Jsonl,
}

/// Message store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// SQLite file name, relative to `general.data_dir`.
    pub sqlite_file: String,
    /// JSON-lines file name, relative to `general.data_dir`.
    pub jsonl_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            sqlite_file: "whatsapp_storage.db".to_string(),
            jsonl_file: "whatsapp_messages.jsonl".to_string(),
        }
    }
}

/// Word co-occurrence graph defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Edges lighter than this are dropped.
    pub min_edge_weight: u32,
    /// Sliding window size; 0 pairs every token within a message.
    pub window: usize,
    /// Maximum hop count from the target word.
    pub max_depth: usize,
    /// Restrict the view to words reachable from the target.
    pub show_paths_only: bool,
    /// Maximum number of candidate target words offered.
    pub max_target_words: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            min_edge_weight: 1,
            window: 2,
            max_depth: 4,
            show_paths_only: true,
            max_target_words: 200,
        }
    }
}

const DEFAULT_SYSTEM_PROMPT: &str = "\
Você é o Assistente de Atendimento e Conciliação da empresa.
Missão: resolver solicitações de clientes com rapidez, cordialidade e foco em acordos justos.
Confirme o entendimento do caso em 1 frase antes de propor solução.
Traga opções de conciliação: reenvio, abatimento, reembolso (parcial/total), crédito em conta, cupom.
Se faltar informação, faça no máximo 2 perguntas diretas e relevantes.

Formato da resposta:
- Resumo do caso:
- Solução proposta:
- Próximos passos:
- Observações:";

/// Chat assistant configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub system_prompt: String,
    pub sentiment_enabled: bool,
    pub sentiment_model: String,
    /// Messages longer than this (in characters) are rejected.
    pub max_message_length: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4.1-mini".to_string(),
            temperature: 0.2,
            max_tokens: 400,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            sentiment_enabled: true,
            sentiment_model: "gpt-4.1-mini".to_string(),
            max_message_length: 2000,
        }
    }
}

/// Retrieval-augmented generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub enabled: bool,
    pub top_k: usize,
    pub score_threshold: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            top_k: 3,
            score_threshold: 0.5,
        }
    }
}

/// Optional rendering capabilities, selected by name at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// "vis-json" or "none".
    pub graph: String,
    /// "frequency" or "none".
    pub word_cloud: String,
    pub dark_mode: bool,
    pub word_cloud_terms: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            graph: "vis-json".to_string(),
            word_cloud: "frequency".to_string(),
            dark_mode: true,
            word_cloud_terms: 100,
        }
    }
}

/// Channel relay reconnect policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub initial_backoff_secs: u64,
    pub max_backoff_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            initial_backoff_secs: 1,
            max_backoff_secs: 60,
        }
    }
}
