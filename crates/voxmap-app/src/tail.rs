//! Event source that follows a growing file of channel frames.
//!
//! External WebSocket dumpers append one JSON frame per line; this source
//! feeds those lines to the relay. The read offset survives reconnects, so
//! a reopened file resumes where the previous connection stopped.

use std::io::SeekFrom;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};

use voxmap_chat::{ChatError, EventSource, EventStream};

pub struct TailSource {
    path: PathBuf,
    offset: Arc<AtomicU64>,
    poll: Duration,
}

impl TailSource {
    pub fn new(path: impl Into<PathBuf>, poll: Duration) -> Self {
        Self {
            path: path.into(),
            offset: Arc::new(AtomicU64::new(0)),
            poll,
        }
    }

    /// Bytes consumed so far.
    pub fn offset(&self) -> u64 {
        self.offset.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventSource for TailSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn connect(&self) -> Result<Box<dyn EventStream>, ChatError> {
        let mut file = File::open(&self.path)
            .await
            .map_err(|e| ChatError::ChannelError(format!("{}: {}", self.path.display(), e)))?;
        let len = file
            .metadata()
            .await
            .map_err(|e| ChatError::ChannelError(e.to_string()))?
            .len();

        let mut offset = self.offset.load(Ordering::SeqCst);
        if len < offset {
            tracing::warn!(path = %self.path.display(), offset, len, "File shrank, reading from start");
            offset = 0;
            self.offset.store(0, Ordering::SeqCst);
        }
        file.seek(SeekFrom::Start(offset))
            .await
            .map_err(|e| ChatError::ChannelError(e.to_string()))?;

        Ok(Box::new(TailStream {
            reader: BufReader::new(file),
            offset: Arc::clone(&self.offset),
            poll: self.poll,
            line: Vec::new(),
        }))
    }
}

struct TailStream {
    reader: BufReader<File>,
    offset: Arc<AtomicU64>,
    poll: Duration,
    /// Bytes of the current line, possibly still incomplete.
    line: Vec<u8>,
}

#[async_trait]
impl EventStream for TailStream {
    async fn next_frame(&mut self) -> Option<Result<String, ChatError>> {
        loop {
            match self.reader.read_until(b'\n', &mut self.line).await {
                Ok(0) => tokio::time::sleep(self.poll).await,
                Ok(_) if self.line.last() != Some(&b'\n') => tokio::time::sleep(self.poll).await,
                Ok(_) => {
                    let bytes = std::mem::take(&mut self.line);
                    self.offset.fetch_add(bytes.len() as u64, Ordering::SeqCst);
                    let line = match String::from_utf8(bytes) {
                        Ok(line) => line,
                        Err(e) => {
                            tracing::warn!(error = %e, "Skipping frame that is not valid UTF-8");
                            continue;
                        }
                    };
                    let frame = line.trim();
                    if !frame.is_empty() {
                        return Some(Ok(frame.to_string()));
                    }
                }
                Err(e) => return Some(Err(ChatError::ChannelError(e.to_string()))),
            }
        }
    }
}
