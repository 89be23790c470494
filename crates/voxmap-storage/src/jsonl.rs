//! JSON Lines message store for local development and small datasets.
//!
//! Each record is one JSON object per line. Saves append; updates rewrite
//! the whole file. Blank and malformed lines are skipped on read and kept
//! verbatim on rewrite.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use uuid::Uuid;

use voxmap_core::error::VoxmapError;
use voxmap_core::types::{MessageRecord, NewQuestion};

use crate::store::{MessageStore, SessionSummary};

pub struct JsonlMessageStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonlMessageStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, ()>, VoxmapError> {
        self.lock
            .lock()
            .map_err(|e| VoxmapError::Storage(format!("JSONL store lock poisoned: {}", e)))
    }

    fn ensure_dir(&self) -> Result<(), VoxmapError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }

    fn read_lines(&self) -> Result<Vec<String>, VoxmapError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(content.lines().map(str::to_string).collect()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn read_all(&self) -> Result<Vec<MessageRecord>, VoxmapError> {
        let lines = self.read_lines()?;
        let mut records = Vec::with_capacity(lines.len());
        let mut skipped = 0usize;
        for line in &lines {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<MessageRecord>(line) {
                Ok(record) => records.push(record),
                Err(_) => skipped += 1,
            }
        }
        if skipped > 0 {
            tracing::warn!(path = %self.path.display(), skipped, "Skipped malformed JSONL lines");
        }
        Ok(records)
    }

    /// Apply `update` to the record with `id` and rewrite the file.
    fn update_record<F>(&self, id: Uuid, update: F) -> Result<bool, VoxmapError>
    where
        F: FnOnce(&mut MessageRecord),
    {
        let _guard = self.guard()?;
        let mut lines = self.read_lines()?;
        let mut update = Some(update);

        for line in lines.iter_mut() {
            let Ok(mut record) = serde_json::from_str::<MessageRecord>(line) else {
                continue;
            };
            if record.id != id {
                continue;
            }
            if let Some(apply) = update.take() {
                apply(&mut record);
                *line = serde_json::to_string(&record)?;
            }
            break;
        }

        if update.is_some() {
            return Ok(false);
        }

        self.ensure_dir()?;
        let mut content = String::new();
        for line in lines.iter().filter(|l| !l.trim().is_empty()) {
            content.push_str(line);
            content.push('\n');
        }
        fs::write(&self.path, content)?;
        Ok(true)
    }
}

impl MessageStore for JsonlMessageStore {
    fn init(&self) -> Result<(), VoxmapError> {
        let _guard = self.guard()?;
        self.ensure_dir()?;
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        Ok(())
    }

    fn save_question(&self, question: NewQuestion) -> Result<Uuid, VoxmapError> {
        let record = question.into_record(Utc::now());
        let line = serde_json::to_string(&record)?;

        let _guard = self.guard()?;
        self.ensure_dir()?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;

        tracing::debug!(id = %record.id, session = %record.session_id, "Question appended");
        Ok(record.id)
    }

    fn get_recent(&self, user_id: &str, n: usize) -> Result<Vec<MessageRecord>, VoxmapError> {
        let _guard = self.guard()?;
        let mut records: Vec<MessageRecord> = self
            .read_all()?
            .into_iter()
            .filter(|r| r.user_id == user_id)
            .collect();
        // Later lines win ties.
        records.reverse();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records.truncate(n);
        Ok(records)
    }

    fn get_session(&self, session_id: &str) -> Result<Vec<MessageRecord>, VoxmapError> {
        let _guard = self.guard()?;
        let mut records: Vec<MessageRecord> = self
            .read_all()?
            .into_iter()
            .filter(|r| r.session_id == session_id)
            .collect();
        records.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(records)
    }

    fn set_tts_info(&self, id: Uuid, audio_uri: &str) -> Result<bool, VoxmapError> {
        self.update_record(id, |r| {
            r.tts_generated = true;
            r.audio_uri = Some(audio_uri.to_string());
        })
    }

    fn set_embedding_id(&self, id: Uuid, embedding_id: &str) -> Result<bool, VoxmapError> {
        self.update_record(id, |r| r.embedding_id = Some(embedding_id.to_string()))
    }

    fn set_rag_result(&self, id: Uuid, rag_result_id: &str) -> Result<bool, VoxmapError> {
        self.update_record(id, |r| r.rag_result_id = Some(rag_result_id.to_string()))
    }

    fn list_sessions(&self) -> Result<Vec<SessionSummary>, VoxmapError> {
        let _guard = self.guard()?;
        let mut sessions: Vec<SessionSummary> = Vec::new();
        for record in self.read_all()? {
            match sessions.iter_mut().find(|s| s.session_id == record.session_id) {
                Some(summary) => {
                    summary.message_count += 1;
                    summary.first_at = summary.first_at.min(record.timestamp);
                    summary.last_at = summary.last_at.max(record.timestamp);
                }
                None => sessions.push(SessionSummary {
                    session_id: record.session_id,
                    message_count: 1,
                    first_at: record.timestamp,
                    last_at: record.timestamp,
                }),
            }
        }
        sessions.sort_by(|a, b| {
            b.last_at
                .cmp(&a.last_at)
                .then_with(|| a.session_id.cmp(&b.session_id))
        });
        Ok(sessions)
    }
}
