//! Reconnecting relay from a channel connection into a [`CaptureHandler`].

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Notify;

use voxmap_core::Backoff;

use crate::channel::CaptureHandler;
use crate::error::ChatError;

/// An open channel connection.
#[async_trait]
pub trait EventStream: Send {
    /// Next text frame; `None` when the peer closed the connection.
    async fn next_frame(&mut self) -> Option<Result<String, ChatError>>;
}

/// Something that can open channel connections.
#[async_trait]
pub trait EventSource: Send + Sync {
    fn describe(&self) -> String;

    async fn connect(&self) -> Result<Box<dyn EventStream>, ChatError>;
}

/// Counters accumulated over a relay run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub connections: u64,
    pub failures: u64,
    pub frames: u64,
    pub saved: u64,
}

enum Disconnect {
    Closed,
    Failed(ChatError),
    Shutdown,
}

/// Relay frames from `source` into `handler` until `shutdown` is notified.
///
/// Every lost or refused connection is retried after the backoff's current
/// delay; a successful connection resets the backoff. Handler errors are
/// logged and do not drop the connection.
pub async fn run_relay(
    source: &dyn EventSource,
    handler: &mut CaptureHandler,
    mut backoff: Backoff,
    shutdown: Arc<Notify>,
) -> RelayStats {
    let mut stats = RelayStats::default();
    let target = source.describe();

    loop {
        tracing::info!(source = %target, "Connecting");
        let connected = tokio::select! {
            result = source.connect() => result,
            _ = shutdown.notified() => break,
        };

        let outcome = match connected {
            Ok(mut stream) => {
                stats.connections += 1;
                backoff.reset();
                tracing::info!(source = %target, "Connected");
                pump(stream.as_mut(), handler, &shutdown, &mut stats).await
            }
            Err(e) => Disconnect::Failed(e),
        };

        match outcome {
            Disconnect::Shutdown => break,
            Disconnect::Closed => tracing::info!(source = %target, "Connection closed"),
            Disconnect::Failed(e) => {
                stats.failures += 1;
                tracing::warn!(source = %target, error = %e, "Connection error");
            }
        }

        let delay = backoff.next_delay();
        tracing::info!(source = %target, delay_ms = delay.as_millis() as u64, "Reconnecting");
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.notified() => break,
        }
    }

    tracing::info!(
        source = %target,
        connections = stats.connections,
        frames = stats.frames,
        saved = stats.saved,
        "Relay stopped"
    );
    stats
}

async fn pump(
    stream: &mut dyn EventStream,
    handler: &mut CaptureHandler,
    shutdown: &Notify,
    stats: &mut RelayStats,
) -> Disconnect {
    loop {
        let frame = tokio::select! {
            frame = stream.next_frame() => frame,
            _ = shutdown.notified() => return Disconnect::Shutdown,
        };

        match frame {
            None => return Disconnect::Closed,
            Some(Err(e)) => return Disconnect::Failed(e),
            Some(Ok(text)) => {
                stats.frames += 1;
                match handler.handle_frame(&text) {
                    Ok(Some(_)) => stats.saved += 1,
                    Ok(None) => {}
                    Err(e) => {
                        tracing::error!(channel = %handler.channel(), error = %e, "Failed to store frame")
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use voxmap_storage::{Database, MessageStore, SqliteMessageStore};

    type Script = Result<Vec<Result<String, ChatError>>, ChatError>;

    /// Replays one scripted outcome per connection attempt; once exhausted,
    /// every attempt is refused.
    struct ScriptedSource {
        scripts: Mutex<VecDeque<Script>>,
        attempts: Mutex<u64>,
    }

    impl ScriptedSource {
        fn new(scripts: Vec<Script>) -> Self {
            Self {
                scripts: Mutex::new(scripts.into()),
                attempts: Mutex::new(0),
            }
        }
    }

    struct ScriptedStream(VecDeque<Result<String, ChatError>>);

    #[async_trait]
    impl EventStream for ScriptedStream {
        async fn next_frame(&mut self) -> Option<Result<String, ChatError>> {
            self.0.pop_front()
        }
    }

    #[async_trait]
    impl EventSource for ScriptedSource {
        fn describe(&self) -> String {
            "scripted".to_string()
        }

        async fn connect(&self) -> Result<Box<dyn EventStream>, ChatError> {
            *self.attempts.lock().unwrap() += 1;
            let next = self.scripts.lock().unwrap().pop_front();
            match next {
                Some(Ok(frames)) => Ok(Box::new(ScriptedStream(frames.into()))),
                Some(Err(e)) => Err(e),
                None => Err(ChatError::ChannelError("refused".to_string())),
            }
        }
    }

    fn frame(text: &str) -> Result<String, ChatError> {
        Ok(format!(
            r#"{{"type":"user_transcript","user_transcription_event":{{"user_transcript":"{}"}}}}"#,
            text
        ))
    }

    fn fast_backoff() -> Backoff {
        Backoff::new(Duration::from_millis(1), Duration::from_millis(8))
    }

    async fn wait_for_records(store: &Arc<dyn MessageStore>, session: &str, n: usize) {
        for _ in 0..200 {
            if store.get_session(session).unwrap().len() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("timed out waiting for {} records", n);
    }

    #[tokio::test]
    async fn test_relay_reconnects_and_captures() {
        let store: Arc<dyn MessageStore> =
            Arc::new(SqliteMessageStore::new(Arc::new(Database::in_memory().unwrap())));
        let source = Arc::new(ScriptedSource::new(vec![
            Err(ChatError::ChannelError("dns failure".to_string())),
            Ok(vec![
                Ok(r#"{"type":"conversation_initiation_metadata","conversation_initiation_metadata":{"conversation_id":"c1"}}"#.to_string()),
                frame("primeira mensagem"),
                Ok("keepalive".to_string()),
            ]),
            Ok(vec![
                frame("segunda mensagem"),
                Err(ChatError::ChannelError("reset by peer".to_string())),
            ]),
        ]));
        let shutdown = Arc::new(Notify::new());

        let task = {
            let source = Arc::clone(&source);
            let store = Arc::clone(&store);
            let shutdown = Arc::clone(&shutdown);
            tokio::spawn(async move {
                let mut handler = CaptureHandler::agents(store);
                run_relay(source.as_ref(), &mut handler, fast_backoff(), shutdown).await
            })
        };

        wait_for_records(&store, "c1", 2).await;
        shutdown.notify_one();
        let stats = tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("relay should stop on shutdown")
            .unwrap();

        assert_eq!(stats.connections, 2);
        assert_eq!(stats.frames, 4);
        assert_eq!(stats.saved, 2);
        assert!(stats.failures >= 2);
        assert!(*source.attempts.lock().unwrap() >= 3);

        let texts: Vec<String> = store
            .get_session("c1")
            .unwrap()
            .into_iter()
            .map(|r| r.text)
            .collect();
        assert_eq!(texts, vec!["primeira mensagem", "segunda mensagem"]);
    }

    #[tokio::test]
    async fn test_relay_stops_when_shutdown_already_signalled() {
        let source = ScriptedSource::new(vec![]);
        let store: Arc<dyn MessageStore> =
            Arc::new(SqliteMessageStore::new(Arc::new(Database::in_memory().unwrap())));
        let mut handler = CaptureHandler::agents(store);
        let shutdown = Arc::new(Notify::new());
        shutdown.notify_one();

        let backoff = Backoff::new(Duration::from_secs(60), Duration::from_secs(60));
        let stats = tokio::time::timeout(
            Duration::from_secs(2),
            run_relay(&source, &mut handler, backoff, shutdown),
        )
        .await
        .expect("relay should honour a pending shutdown");
        assert_eq!(stats.connections, 0);
    }
}
