use super::config::VoiceSessionConfig;
use super::controller::{SessionDeps, VoiceSession};
use super::status::SessionStatus;
use crate::audio::{AudioDevices, CaptureConfig};
use crate::config::Config;
use crate::dialogue::{PromoGenerator, PromoNotice, SelectionSet, ToolDispatcher};
use crate::error::SessionError;
use crate::inventory::InventoryStore;
use crate::remote::RemoteEndpoint;
use crate::transcript::TranscriptEntry;
use crate::usage::Account;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::info;

/// Per-engine session defaults, shared by every session it starts.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub model: String,
    pub greeting: String,
    pub input_sample_rate: u32,
    pub output_sample_rate: u32,
    pub capture_block_frames: usize,
}

impl From<&Config> for EngineConfig {
    fn from(cfg: &Config) -> Self {
        Self {
            model: cfg.assistant.model.clone(),
            greeting: cfg.assistant.greeting.clone(),
            input_sample_rate: cfg.audio.input_sample_rate,
            output_sample_rate: cfg.audio.output_sample_rate,
            capture_block_frames: cfg.audio.capture_block_frames,
        }
    }
}

/// Outcome of a toggle request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    Started { session_id: String },
    Stopped,
}

/// Owns at most one live `VoiceSession` at a time, plus the state that
/// outlives sessions: the inventory store, the account, and the selection
/// set.
///
/// Toggle semantics, not queueing: toggling while a session is live stops it
/// and does not start a replacement; the next toggle starts fresh.
pub struct VoiceEngine {
    config: EngineConfig,
    endpoint: Arc<dyn RemoteEndpoint>,
    devices: Arc<dyn AudioDevices>,
    store: Arc<dyn InventoryStore>,
    account: Arc<Mutex<Account>>,
    selection: SelectionSet,
    promo: Arc<dyn PromoGenerator>,
    promo_tx: mpsc::UnboundedSender<PromoNotice>,
    current: Mutex<Option<Arc<VoiceSession>>>,
}

impl VoiceEngine {
    /// Build an engine. The returned receiver carries promo-generation
    /// completion notices, which arrive independently of tool responses.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: EngineConfig,
        endpoint: Arc<dyn RemoteEndpoint>,
        devices: Arc<dyn AudioDevices>,
        store: Arc<dyn InventoryStore>,
        account: Account,
        promo: Arc<dyn PromoGenerator>,
    ) -> (Self, mpsc::UnboundedReceiver<PromoNotice>) {
        let (promo_tx, promo_rx) = mpsc::unbounded_channel();
        (
            Self {
                config,
                endpoint,
                devices,
                store,
                account: Arc::new(Mutex::new(account)),
                selection: SelectionSet::new(),
                promo,
                promo_tx,
                current: Mutex::new(None),
            },
            promo_rx,
        )
    }

    /// The mic-button action: stop the live session if there is one,
    /// otherwise start a new one.
    pub async fn toggle(&self) -> Result<ToggleOutcome, SessionError> {
        let mut current = self.current.lock().await;

        if let Some(session) = current.take() {
            if session.is_active() {
                info!("Toggle: stopping live session {}", session.session_id());
                session.stop().await;
                return Ok(ToggleOutcome::Stopped);
            }
            // The session fell over on its own; fall through and start fresh.
        }

        let session = self.start_session().await?;
        let session_id = session.session_id().to_string();
        *current = Some(session);
        Ok(ToggleOutcome::Started { session_id })
    }

    /// Stop the live session, if any. Safe to call when nothing is running.
    pub async fn stop(&self) {
        if let Some(session) = self.current.lock().await.take() {
            session.stop().await;
        }
    }

    pub async fn status(&self) -> Option<SessionStatus> {
        match self.current.lock().await.as_ref() {
            Some(session) => Some(session.status().await),
            None => None,
        }
    }

    /// Transcript of the current session, empty when nothing is live.
    pub async fn transcript(&self) -> Vec<TranscriptEntry> {
        match self.current.lock().await.as_ref() {
            Some(session) => session.transcript().await,
            None => Vec::new(),
        }
    }

    /// The selection set shared between the screen and voice bulk actions.
    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn store(&self) -> &Arc<dyn InventoryStore> {
        &self.store
    }

    async fn start_session(&self) -> Result<Arc<VoiceSession>, SessionError> {
        let capture_config = CaptureConfig {
            sample_rate: self.config.input_sample_rate,
            block_frames: self.config.capture_block_frames,
        };
        let input = self.devices.open_input(&capture_config).await?;
        let (sink, completions) = self
            .devices
            .open_output(self.config.output_sample_rate)
            .await?;

        let dispatcher = ToolDispatcher::new(
            Arc::clone(&self.store),
            Arc::clone(&self.account),
            self.selection.clone(),
            Arc::clone(&self.promo),
            self.promo_tx.clone(),
        );

        let config = VoiceSessionConfig {
            session_id: format!("voice-{}", uuid::Uuid::new_v4()),
            model: self.config.model.clone(),
            input_sample_rate: self.config.input_sample_rate,
            output_sample_rate: self.config.output_sample_rate,
            capture_block_frames: self.config.capture_block_frames,
            greeting: self.config.greeting.clone(),
        };

        VoiceSession::start(
            config,
            SessionDeps {
                endpoint: Arc::clone(&self.endpoint),
                input,
                sink,
                completions,
                dispatcher,
            },
        )
        .await
    }
}
