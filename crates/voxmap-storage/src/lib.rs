//! VoxMap Storage crate - persistence for captured user messages.
//!
//! Provides a WAL-mode SQLite database with migrations, a JSON Lines
//! alternative for prototyping, and the `MessageStore` interface both
//! implement.

pub mod db;
pub mod jsonl;
pub mod migrations;
pub mod sqlite;
pub mod store;

pub use db::Database;
pub use jsonl::JsonlMessageStore;
pub use sqlite::SqliteMessageStore;
pub use store::{open_store, session_token_sequences, MessageStore, SessionSummary};
