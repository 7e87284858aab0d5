use super::endpoint::{RemoteEndpoint, RemoteSession, SessionSpec};
use super::messages::{AudioFrameMessage, ServerEvent, ToolResultMessage};
use crate::error::SessionError;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Endpoint for running without a live conversational service.
///
/// Accepts every session, synthesizes silence in place of speech, and
/// discards whatever it is sent. The event channel stays open until the
/// session is closed, so an offline session lives until it is stopped.
pub struct OfflineEndpoint {
    output_sample_rate: u32,
}

impl OfflineEndpoint {
    pub fn new(output_sample_rate: u32) -> Self {
        Self { output_sample_rate }
    }
}

struct OfflineSession {
    session_id: String,
    // Held so the event channel stays open for the session's lifetime.
    events: Mutex<Option<mpsc::Sender<ServerEvent>>>,
}

#[async_trait]
impl RemoteSession for OfflineSession {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn send_audio_frame(&self, frame: AudioFrameMessage) -> Result<()> {
        debug!(
            "Offline endpoint discarding audio frame {} ({} bytes)",
            frame.sequence,
            frame.pcm.len()
        );
        Ok(())
    }

    async fn send_tool_result(&self, result: ToolResultMessage) -> Result<()> {
        debug!(
            "Offline endpoint discarding tool result for {}: {}",
            result.call_id, result.message
        );
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if self.events.lock().map_err(|_| anyhow::anyhow!("event sender lock poisoned"))?.take().is_some() {
            info!("Offline session closed: {}", self.session_id);
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteEndpoint for OfflineEndpoint {
    async fn open(
        &self,
        spec: SessionSpec,
    ) -> Result<(Box<dyn RemoteSession>, mpsc::Receiver<ServerEvent>), SessionError> {
        let (tx, rx) = mpsc::channel(64);
        info!(
            "Offline endpoint: opened session {} ({} tools declared)",
            spec.session_id,
            spec.tools.len()
        );
        let session = OfflineSession {
            session_id: spec.session_id,
            events: Mutex::new(Some(tx)),
        };
        Ok((Box::new(session), rx))
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<i16>, SessionError> {
        // Silence sized at roughly normal speaking pace.
        let words = text.split_whitespace().count().max(1);
        let samples = words * self.output_sample_rate as usize * 3 / 10;
        Ok(vec![0; samples])
    }
}
