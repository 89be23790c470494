//! The message store interface shared by the SQLite and JSONL backends.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use voxmap_analytics::tokenize;
use voxmap_core::config::{StorageBackend, StorageConfig};
use voxmap_core::error::VoxmapError;
use voxmap_core::types::{MessageRecord, NewQuestion};

use crate::db::Database;
use crate::jsonl::JsonlMessageStore;
use crate::sqlite::SqliteMessageStore;

/// Per-session activity overview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub message_count: u64,
    pub first_at: DateTime<Utc>,
    pub last_at: DateTime<Utc>,
}

/// Persistence for captured user messages.
///
/// Implementations assign the id and timestamp on save. The `set_*`
/// operations return `false` when no record has the given id.
pub trait MessageStore: Send + Sync {
    /// Create the backing table or file if missing.
    fn init(&self) -> Result<(), VoxmapError>;

    fn save_question(&self, question: NewQuestion) -> Result<Uuid, VoxmapError>;

    /// Save several messages in order. Backends that can write them
    /// atomically store all or none.
    fn save_questions(&self, questions: Vec<NewQuestion>) -> Result<Vec<Uuid>, VoxmapError> {
        questions
            .into_iter()
            .map(|question| self.save_question(question))
            .collect()
    }

    /// The `n` most recent records of `user_id`, newest first.
    fn get_recent(&self, user_id: &str, n: usize) -> Result<Vec<MessageRecord>, VoxmapError>;

    /// All records of a session, oldest first.
    fn get_session(&self, session_id: &str) -> Result<Vec<MessageRecord>, VoxmapError>;

    fn set_tts_info(&self, id: Uuid, audio_uri: &str) -> Result<bool, VoxmapError>;

    fn set_embedding_id(&self, id: Uuid, embedding_id: &str) -> Result<bool, VoxmapError>;

    fn set_rag_result(&self, id: Uuid, rag_result_id: &str) -> Result<bool, VoxmapError>;

    /// Sessions ordered by most recent activity first.
    fn list_sessions(&self) -> Result<Vec<SessionSummary>, VoxmapError>;
}

/// Token sequences of a stored session, one per message with content words.
pub fn session_token_sequences(
    store: &dyn MessageStore,
    session_id: &str,
) -> Result<Vec<Vec<String>>, VoxmapError> {
    let records = store.get_session(session_id)?;
    Ok(records
        .iter()
        .map(|r| tokenize(&r.text))
        .filter(|tokens| !tokens.is_empty())
        .collect())
}

/// Open the configured backend under `data_dir` and initialize it.
pub fn open_store(
    config: &StorageConfig,
    data_dir: &Path,
) -> Result<Arc<dyn MessageStore>, VoxmapError> {
    let store: Arc<dyn MessageStore> = match config.backend {
        StorageBackend::Sqlite => {
            let db = Database::new(&data_dir.join(&config.sqlite_file))?;
            Arc::new(SqliteMessageStore::new(Arc::new(db)))
        }
        StorageBackend::Jsonl => Arc::new(JsonlMessageStore::new(data_dir.join(&config.jsonl_file))),
    };
    store.init()?;
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxmap_core::types::channel;

    #[test]
    fn test_session_token_sequences_skip_empty_messages() {
        let store = SqliteMessageStore::new(Arc::new(Database::in_memory().unwrap()));
        store
            .save_question(NewQuestion::new("u1", "s1", channel::WHATSAPP, "Meu pedido atrasou"))
            .unwrap();
        store
            .save_question(NewQuestion::new("u1", "s1", channel::WHATSAPP, "ok"))
            .unwrap();
        store
            .save_question(NewQuestion::new("u1", "s1", channel::WHATSAPP, "Pedido cancelado"))
            .unwrap();
        store
            .save_question(NewQuestion::new("u2", "s2", channel::WHATSAPP, "Outra sessão"))
            .unwrap();

        let seqs = session_token_sequences(&store, "s1").unwrap();
        assert_eq!(
            seqs,
            vec![
                vec!["pedido".to_string(), "atrasou".to_string()],
                vec!["pedido".to_string(), "cancelado".to_string()],
            ]
        );
        assert!(session_token_sequences(&store, "missing").unwrap().is_empty());
    }

    #[test]
    fn test_open_store_for_each_backend() {
        let dir = tempfile::tempdir().unwrap();

        let sqlite = open_store(&StorageConfig::default(), dir.path()).unwrap();
        sqlite
            .save_question(NewQuestion::new("u", "s", channel::CHAT_UI, "olá mundo"))
            .unwrap();
        assert!(dir.path().join("whatsapp_storage.db").exists());

        let config = StorageConfig {
            backend: StorageBackend::Jsonl,
            ..StorageConfig::default()
        };
        let jsonl = open_store(&config, dir.path()).unwrap();
        assert!(dir.path().join("whatsapp_messages.jsonl").exists());
        assert!(jsonl.get_session("s").unwrap().is_empty());
    }
}
