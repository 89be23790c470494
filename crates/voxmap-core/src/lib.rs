pub mod backoff;
pub mod config;
pub mod error;
pub mod types;

pub use backoff::Backoff;
pub use config::VoxmapConfig;
pub use error::{Result, VoxmapError};
pub use types::*;
