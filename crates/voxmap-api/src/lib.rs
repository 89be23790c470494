//! VoxMap API crate - axum HTTP server for channel webhooks and session views.
//!
//! Messaging channels post user messages to the webhook routes; dashboards
//! read back the stored messages, the word graph and the word cloud of a
//! session.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
