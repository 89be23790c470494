use thiserror::Error;

use voxmap_core::error::VoxmapError;

/// Errors that can occur in the analytics pipeline.
#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("invalid sliding window size {0}: must be at least 2")]
    InvalidWindow(usize),
    #[error("malformed sentiment reply: {0}")]
    MalformedSentiment(String),
    #[error("render error: {0}")]
    Render(String),
}

impl From<AnalyticsError> for VoxmapError {
    fn from(err: AnalyticsError) -> Self {
        VoxmapError::Analytics(err.to_string())
    }
}
