use thiserror::Error;

/// Top-level error type for VoxMap.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for VoxmapError` so that `?` works across crate
/// boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VoxmapError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Analytics error: {0}")]
    Analytics(String),

    #[error("Chat error: {0}")]
    Chat(String),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Shutdown in progress")]
    ShuttingDown,
}

impl From<toml::de::Error> for VoxmapError {
    fn from(err: toml::de::Error) -> Self {
        VoxmapError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for VoxmapError {
    fn from(err: toml::ser::Error) -> Self {
        VoxmapError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for VoxmapError {
    fn from(err: serde_json::Error) -> Self {
        VoxmapError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for VoxMap operations.
pub type Result<T> = std::result::Result<T, VoxmapError>;
