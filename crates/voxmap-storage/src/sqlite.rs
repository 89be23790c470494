//! SQLite-backed message store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use uuid::Uuid;

use voxmap_core::error::VoxmapError;
use voxmap_core::types::{format_timestamp, MessageRecord, NewQuestion};

use crate::db::Database;
use crate::store::{MessageStore, SessionSummary};

const SELECT_COLUMNS: &str = "SELECT id, user_id, session_id, channel, text, normalized_text, timestamp,
        embedding_id, rag_result_id, tts_generated, audio_uri, metadata
 FROM user_questions";

/// Repository for `user_questions` rows.
pub struct SqliteMessageStore {
    db: Arc<Database>,
}

impl SqliteMessageStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Find a record by id.
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<MessageRecord>, VoxmapError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&format!("{} WHERE id = ?1", SELECT_COLUMNS))
                .map_err(|e| VoxmapError::Storage(e.to_string()))?;

            let result = stmt
                .query_row(rusqlite::params![id.to_string()], |row| Ok(row_to_record(row)))
                .optional()
                .map_err(|e| VoxmapError::Storage(e.to_string()))?;

            result.transpose()
        })
    }

    /// Count stored records.
    pub fn count(&self) -> Result<u64, VoxmapError> {
        self.db.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM user_questions", [], |row| row.get(0))
                .map_err(|e| VoxmapError::Storage(e.to_string()))?;
            Ok(count as u64)
        })
    }

    fn query_records(
        &self,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<MessageRecord>, VoxmapError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(sql)
                .map_err(|e| VoxmapError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(params, |row| Ok(row_to_record(row)))
                .map_err(|e| VoxmapError::Storage(e.to_string()))?;

            let mut records = Vec::new();
            for row in rows {
                let record = row.map_err(|e| VoxmapError::Storage(e.to_string()))??;
                records.push(record);
            }
            Ok(records)
        })
    }

    fn update(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<bool, VoxmapError> {
        self.db.with_conn(|conn| {
            let changed = conn
                .execute(sql, params)
                .map_err(|e| VoxmapError::Storage(format!("Failed to update record: {}", e)))?;
            Ok(changed > 0)
        })
    }
}

impl MessageStore for SqliteMessageStore {
    fn init(&self) -> Result<(), VoxmapError> {
        // Schema is applied by the migrations when the database opens.
        self.db.with_conn(crate::migrations::run_migrations)
    }

    fn save_question(&self, question: NewQuestion) -> Result<Uuid, VoxmapError> {
        let record = question.into_record(Utc::now());
        let metadata = serde_json::to_string(&record.metadata)?;

        self.db
            .with_conn(|conn| insert_record(conn, &record, &metadata))?;

        tracing::debug!(
            id = %record.id,
            session = %record.session_id,
            channel = %record.channel,
            "Question saved"
        );
        Ok(record.id)
    }

    fn save_questions(&self, questions: Vec<NewQuestion>) -> Result<Vec<Uuid>, VoxmapError> {
        let mut rows = Vec::with_capacity(questions.len());
        for question in questions {
            let record = question.into_record(Utc::now());
            let metadata = serde_json::to_string(&record.metadata)?;
            rows.push((record, metadata));
        }

        self.db.with_conn_mut(|conn| {
            let tx = conn
                .transaction()
                .map_err(|e| VoxmapError::Storage(format!("Failed to begin batch: {}", e)))?;
            for (record, metadata) in &rows {
                insert_record(&tx, record, metadata)?;
            }
            tx.commit()
                .map_err(|e| VoxmapError::Storage(format!("Failed to commit batch: {}", e)))
        })?;

        tracing::debug!(count = rows.len(), "Question batch saved");
        Ok(rows.into_iter().map(|(record, _)| record.id).collect())
    }

    fn get_recent(&self, user_id: &str, n: usize) -> Result<Vec<MessageRecord>, VoxmapError> {
        let limit = n as i64;
        self.query_records(
            &format!(
                "{} WHERE user_id = ?1 ORDER BY timestamp DESC, rowid DESC LIMIT ?2",
                SELECT_COLUMNS
            ),
            rusqlite::params![user_id, limit],
        )
    }

    fn get_session(&self, session_id: &str) -> Result<Vec<MessageRecord>, VoxmapError> {
        self.query_records(
            &format!(
                "{} WHERE session_id = ?1 ORDER BY timestamp ASC, rowid ASC",
                SELECT_COLUMNS
            ),
            rusqlite::params![session_id],
        )
    }

    fn set_tts_info(&self, id: Uuid, audio_uri: &str) -> Result<bool, VoxmapError> {
        self.update(
            "UPDATE user_questions SET tts_generated = 1, audio_uri = ?1 WHERE id = ?2",
            rusqlite::params![audio_uri, id.to_string()],
        )
    }

    fn set_embedding_id(&self, id: Uuid, embedding_id: &str) -> Result<bool, VoxmapError> {
        self.update(
            "UPDATE user_questions SET embedding_id = ?1 WHERE id = ?2",
            rusqlite::params![embedding_id, id.to_string()],
        )
    }

    fn set_rag_result(&self, id: Uuid, rag_result_id: &str) -> Result<bool, VoxmapError> {
        self.update(
            "UPDATE user_questions SET rag_result_id = ?1 WHERE id = ?2",
            rusqlite::params![rag_result_id, id.to_string()],
        )
    }

    fn list_sessions(&self) -> Result<Vec<SessionSummary>, VoxmapError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT session_id, COUNT(*), MIN(timestamp), MAX(timestamp)
                     FROM user_questions
                     GROUP BY session_id
                     ORDER BY MAX(timestamp) DESC, session_id ASC",
                )
                .map_err(|e| VoxmapError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map([], |row| {
                    let session_id: String = row.get(0)?;
                    let count: i64 = row.get(1)?;
                    let first: String = row.get(2)?;
                    let last: String = row.get(3)?;
                    Ok((session_id, count, first, last))
                })
                .map_err(|e| VoxmapError::Storage(e.to_string()))?;

            let mut sessions = Vec::new();
            for row in rows {
                let (session_id, count, first, last) =
                    row.map_err(|e| VoxmapError::Storage(e.to_string()))?;
                sessions.push(SessionSummary {
                    session_id,
                    message_count: count as u64,
                    first_at: parse_timestamp(&first)?,
                    last_at: parse_timestamp(&last)?,
                });
            }
            Ok(sessions)
        })
    }
}

// ============================================================================
// Helper functions for row-to-entity conversion.
// ============================================================================

fn insert_record(
    conn: &rusqlite::Connection,
    record: &MessageRecord,
    metadata: &str,
) -> Result<(), VoxmapError> {
    conn.execute(
        "INSERT INTO user_questions
            (id, user_id, session_id, channel, text, normalized_text, timestamp, metadata)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            record.id.to_string(),
            record.user_id,
            record.session_id,
            record.channel,
            record.text,
            record.normalized_text,
            format_timestamp(&record.timestamp),
            metadata,
        ],
    )
    .map_err(|e| VoxmapError::Storage(format!("Failed to save question: {}", e)))?;
    Ok(())
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, VoxmapError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| VoxmapError::Storage(format!("Invalid timestamp '{}': {}", raw, e)))
}

fn row_to_record(row: &rusqlite::Row<'_>) -> Result<MessageRecord, VoxmapError> {
    let get_err = |e: rusqlite::Error| VoxmapError::Storage(e.to_string());

    let id_str: String = row.get(0).map_err(get_err)?;
    let timestamp: String = row.get(6).map_err(get_err)?;
    let tts_generated: i64 = row.get(9).map_err(get_err)?;
    let metadata: Option<String> = row.get(11).map_err(get_err)?;

    let metadata = match metadata.as_deref() {
        Some(raw) if !raw.trim().is_empty() => serde_json::from_str(raw)?,
        _ => serde_json::Value::Object(serde_json::Map::new()),
    };

    Ok(MessageRecord {
        id: Uuid::parse_str(&id_str)
            .map_err(|e| VoxmapError::Storage(format!("Invalid UUID: {}", e)))?,
        user_id: row.get(1).map_err(get_err)?,
        session_id: row.get(2).map_err(get_err)?,
        channel: row.get(3).map_err(get_err)?,
        text: row.get(4).map_err(get_err)?,
        normalized_text: row.get(5).map_err(get_err)?,
        timestamp: parse_timestamp(&timestamp)?,
        embedding_id: row.get(7).map_err(get_err)?,
        rag_result_id: row.get(8).map_err(get_err)?,
        tts_generated: tts_generated != 0,
        audio_uri: row.get(10).map_err(get_err)?,
        metadata,
    })
}
