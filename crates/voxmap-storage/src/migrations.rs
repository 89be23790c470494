//! Database schema migrations.
//!
//! Version 1 creates the `user_questions` table and its lookup indexes.

use rusqlite::Connection;
use tracing::info;

use voxmap_core::error::VoxmapError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), VoxmapError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| VoxmapError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| VoxmapError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!(version = 1, "Applied migration: user_questions");
    }

    Ok(())
}

/// Version 1: user_questions.
///
/// Timestamps are fixed-width RFC 3339 text, so ordering by the column is
/// chronological.
fn apply_v1(conn: &Connection) -> Result<(), VoxmapError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS user_questions (
            id              TEXT PRIMARY KEY NOT NULL,
            user_id         TEXT NOT NULL,
            session_id      TEXT NOT NULL,
            channel         TEXT NOT NULL,
            text            TEXT NOT NULL DEFAULT '',
            normalized_text TEXT,
            timestamp       TEXT NOT NULL,
            embedding_id    TEXT,
            rag_result_id   TEXT,
            tts_generated   INTEGER NOT NULL DEFAULT 0,
            audio_uri       TEXT,
            metadata        TEXT NOT NULL DEFAULT '{}'
        );

        CREATE INDEX IF NOT EXISTS idx_user_timestamp
            ON user_questions (user_id, timestamp DESC);

        CREATE INDEX IF NOT EXISTS idx_session_timestamp
            ON user_questions (session_id, timestamp);

        INSERT INTO schema_migrations (version, name) VALUES (1, 'user_questions');
        ",
    )
    .map_err(|e| VoxmapError::Storage(format!("Migration v1 failed: {}", e)))?;

    Ok(())
}
