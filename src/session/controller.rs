use super::config::VoiceSessionConfig;
use super::status::SessionStatus;
use crate::audio::{decode_pcm, encode_block, AudioInput, AudioSink, PlaybackScheduler, SourceId};
use crate::dialogue::{build_system_prompt, declarations, ToolDispatcher};
use crate::error::SessionError;
use crate::remote::{
    AudioFrameMessage, RemoteEndpoint, RemoteSession, ServerEvent, SessionSpec, ToolResultMessage,
    TransportErrorKind,
};
use crate::transcript::{Speaker, Transcript, TranscriptEntry};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Everything a session borrows from the outside world: the endpoint, the
/// audio devices, and a dispatcher bound to the shared store and account.
pub struct SessionDeps {
    pub endpoint: Arc<dyn RemoteEndpoint>,
    pub input: Box<dyn AudioInput>,
    pub sink: Arc<dyn AudioSink>,
    /// Source-completion notifications from the sink.
    pub completions: mpsc::UnboundedReceiver<SourceId>,
    pub dispatcher: ToolDispatcher,
}

/// One live voice interaction: owns the audio pipeline, the remote session,
/// and the tool dispatcher, and guarantees full teardown on every exit path.
///
/// `start` returns a running session handle; `stop` is idempotent and is the
/// only cancellation primitive. A transport error or remote close runs the
/// same teardown from inside the event loop.
pub struct VoiceSession {
    config: VoiceSessionConfig,
    started_at: DateTime<Utc>,
    active: Arc<AtomicBool>,
    frames_sent: Arc<AtomicUsize>,
    transcript: Arc<Mutex<Transcript>>,
    input: Arc<Mutex<Box<dyn AudioInput>>>,
    sink: Arc<dyn AudioSink>,
    scheduler: Arc<Mutex<PlaybackScheduler>>,
    remote: Arc<Mutex<Option<Box<dyn RemoteSession>>>>,
    dispatcher: Arc<Mutex<ToolDispatcher>>,
    shutdown: watch::Sender<bool>,
    capture_task: Mutex<Option<JoinHandle<()>>>,
    event_task: Mutex<Option<JoinHandle<()>>>,
}

impl VoiceSession {
    /// Set up all session resources and go live.
    ///
    /// Runs the full start sequence: capture device, output sink, greeting,
    /// remote session, capture pump, event loop. Any failure along the way
    /// releases everything acquired so far and surfaces a classified error;
    /// a half-initialized session is never returned.
    pub async fn start(
        config: VoiceSessionConfig,
        deps: SessionDeps,
    ) -> Result<Arc<Self>, SessionError> {
        info!("Starting voice session: {}", config.session_id);

        let SessionDeps {
            endpoint,
            mut input,
            sink,
            completions,
            dispatcher,
        } = deps;

        let capture_rx = match input.start().await {
            Ok(rx) => rx,
            Err(e) => {
                error!("Capture device failed to open: {}", e);
                return Err(e);
            }
        };

        // The pump consumes the device channel from the moment the device
        // opens. Blocks arriving before the remote handle is installed are
        // dropped inside the pump, never queued, so the model does not get a
        // burst of stale audio when the session opens.
        let active = Arc::new(AtomicBool::new(true));
        let frames_sent = Arc::new(AtomicUsize::new(0));
        let remote: Arc<Mutex<Option<Box<dyn RemoteSession>>>> = Arc::new(Mutex::new(None));
        let (shutdown, shutdown_rx) = watch::channel(false);
        let capture_task = tokio::spawn(capture_pump(
            capture_rx,
            shutdown_rx.clone(),
            Arc::clone(&active),
            Arc::clone(&remote),
            Arc::clone(&frames_sent),
            config.session_id.clone(),
        ));

        if let Err(e) = sink.resume() {
            abort_start(&active, &shutdown, capture_task, &mut input).await;
            return Err(SessionError::Connection(format!(
                "output device unavailable: {e:#}"
            )));
        }

        let mut scheduler = PlaybackScheduler::new(config.output_sample_rate);
        let mut transcript = Transcript::new();

        // Greet before the live session opens. An authorization failure here
        // means the live connect would fail the same way, so abort; anything
        // else falls through to the conversation.
        match endpoint.synthesize(&config.greeting).await {
            Ok(samples) => {
                if let Err(e) = scheduler.enqueue(sink.as_ref(), samples) {
                    warn!("Failed to schedule greeting: {e:#}");
                }
                transcript.push_delta(Speaker::Assistant, &config.greeting);
            }
            Err(SessionError::Unauthorized(msg)) => {
                error!("Greeting synthesis rejected: credentials invalid");
                abort_start(&active, &shutdown, capture_task, &mut input).await;
                return Err(SessionError::Unauthorized(msg));
            }
            Err(e) => {
                warn!("Greeting synthesis failed, continuing without it: {}", e);
            }
        }

        let spec = SessionSpec {
            session_id: config.session_id.clone(),
            model: config.model.clone(),
            system_prompt: build_system_prompt(&dispatcher.shop_categories().await),
            tools: declarations(),
            transcription: true,
        };

        let (remote_session, events) = match endpoint.open(spec).await {
            Ok(opened) => opened,
            Err(e) => {
                error!("Failed to open remote session: {}", e);
                abort_start(&active, &shutdown, capture_task, &mut input).await;
                scheduler.stop_all(sink.as_ref());
                return Err(e);
            }
        };

        // From here on the pump forwards blocks as they arrive.
        *remote.lock().await = Some(remote_session);

        let session = Arc::new(Self {
            started_at: Utc::now(),
            active,
            frames_sent,
            transcript: Arc::new(Mutex::new(transcript)),
            input: Arc::new(Mutex::new(input)),
            sink,
            scheduler: Arc::new(Mutex::new(scheduler)),
            remote,
            dispatcher: Arc::new(Mutex::new(dispatcher)),
            shutdown,
            capture_task: Mutex::new(Some(capture_task)),
            event_task: Mutex::new(None),
            config,
        });

        let event_task = tokio::spawn(event_loop(EventLoopParts {
            events,
            completions,
            shutdown: shutdown_rx,
            active: Arc::clone(&session.active),
            scheduler: Arc::clone(&session.scheduler),
            sink: Arc::clone(&session.sink),
            transcript: Arc::clone(&session.transcript),
            dispatcher: Arc::clone(&session.dispatcher),
            remote: Arc::clone(&session.remote),
            input: Arc::clone(&session.input),
            session_id: session.config.session_id.clone(),
        }));

        *session.event_task.lock().await = Some(event_task);

        info!("Voice session started: {}", session.config.session_id);
        Ok(session)
    }

    /// Tear the session down. Idempotent: the first call releases every
    /// resource, repeated calls are cheap no-ops.
    pub async fn stop(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            debug!("Session already stopped: {}", self.config.session_id);
            return;
        }

        info!("Stopping voice session: {}", self.config.session_id);
        let _ = self.shutdown.send(true);

        release_resources(
            &self.input,
            &self.scheduler,
            self.sink.as_ref(),
            &self.remote,
            &self.dispatcher,
        )
        .await;

        if let Some(task) = self.capture_task.lock().await.take() {
            if let Err(e) = task.await {
                error!("Capture task panicked: {}", e);
            }
        }
        if let Some(task) = self.event_task.lock().await.take() {
            if let Err(e) = task.await {
                error!("Event task panicked: {}", e);
            }
        }

        info!("Voice session stopped: {}", self.config.session_id);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn session_id(&self) -> &str {
        &self.config.session_id
    }

    pub async fn status(&self) -> SessionStatus {
        let duration = Utc::now().signed_duration_since(self.started_at);
        SessionStatus {
            active: self.is_active(),
            session_id: self.config.session_id.clone(),
            started_at: self.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            frames_sent: self.frames_sent.load(Ordering::SeqCst),
            transcript_entries: self.transcript.lock().await.len(),
        }
    }

    /// The merged transcript accumulated so far.
    pub async fn transcript(&self) -> Vec<TranscriptEntry> {
        self.transcript.lock().await.entries().to_vec()
    }
}

/// Tear down a partially started session: stop the capture pump, then the
/// device. Used by the failure paths of `VoiceSession::start`.
async fn abort_start(
    active: &Arc<AtomicBool>,
    shutdown: &watch::Sender<bool>,
    capture_task: tokio::task::JoinHandle<()>,
    input: &mut Box<dyn AudioInput>,
) {
    active.store(false, Ordering::SeqCst);
    let _ = shutdown.send(true);
    if let Err(e) = capture_task.await {
        error!("Capture task panicked: {}", e);
    }
    if let Err(e) = input.stop().await {
        warn!("Failed to stop capture device: {e:#}");
    }
}

/// Forwards capture blocks to the remote session as encoded frames.
///
/// One block in flight at a time; blocks arriving while the remote handle is
/// absent (the greeting and session handshake are still in progress) are
/// dropped rather than queued. Stops the instant the session deactivates,
/// even before the device is torn down.
async fn capture_pump(
    mut capture_rx: mpsc::Receiver<crate::audio::CaptureBlock>,
    mut shutdown: watch::Receiver<bool>,
    active: Arc<AtomicBool>,
    remote: Arc<Mutex<Option<Box<dyn RemoteSession>>>>,
    frames_sent: Arc<AtomicUsize>,
    session_id: String,
) {
    debug!("Capture pump started");
    let mut sequence: u32 = 0;

    loop {
        let block = tokio::select! {
            _ = shutdown.changed() => break,
            block = capture_rx.recv() => match block {
                Some(block) => block,
                None => break,
            },
        };

        if !active.load(Ordering::SeqCst) {
            break;
        }

        let guard = remote.lock().await;
        let Some(session) = guard.as_ref() else {
            debug!("Dropping capture block: remote session not open yet");
            continue;
        };

        let frame = AudioFrameMessage {
            session_id: session_id.clone(),
            sequence,
            pcm: encode_block(&block.samples),
            sample_rate: block.sample_rate,
            channels: 1,
            timestamp: Utc::now().to_rfc3339(),
        };

        if let Err(e) = session.send_audio_frame(frame).await {
            warn!("Failed to send audio frame: {e:#}");
        } else {
            sequence += 1;
            frames_sent.fetch_add(1, Ordering::SeqCst);
        }
    }

    debug!("Capture pump stopped");
}

struct EventLoopParts {
    events: mpsc::Receiver<ServerEvent>,
    completions: mpsc::UnboundedReceiver<SourceId>,
    shutdown: watch::Receiver<bool>,
    active: Arc<AtomicBool>,
    scheduler: Arc<Mutex<PlaybackScheduler>>,
    sink: Arc<dyn AudioSink>,
    transcript: Arc<Mutex<Transcript>>,
    dispatcher: Arc<Mutex<ToolDispatcher>>,
    remote: Arc<Mutex<Option<Box<dyn RemoteSession>>>>,
    input: Arc<Mutex<Box<dyn AudioInput>>>,
    session_id: String,
}

/// Consumes server events and playback completions until the session stops
/// or the remote side goes away. A remote error or close runs the same
/// teardown `stop()` would, guarded by the active flag so it happens once.
async fn event_loop(parts: EventLoopParts) {
    let EventLoopParts {
        mut events,
        mut completions,
        mut shutdown,
        active,
        scheduler,
        sink,
        transcript,
        dispatcher,
        remote,
        input,
        session_id,
    } = parts;

    debug!("Session event loop started");
    let mut completions_open = true;
    let mut remote_gone = false;

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,

            done = completions.recv(), if completions_open => {
                match done {
                    Some(id) => scheduler.lock().await.source_done(id),
                    None => completions_open = false,
                }
            }

            ev = events.recv() => {
                let Some(ev) = ev else {
                    info!("Remote event stream ended");
                    remote_gone = true;
                    break;
                };
                match ev {
                    ServerEvent::AudioDelta { pcm } => match decode_pcm(&pcm) {
                        Ok(samples) => {
                            let mut sched = scheduler.lock().await;
                            if let Err(e) = sched.enqueue(sink.as_ref(), samples) {
                                warn!("Failed to schedule playback chunk: {e:#}");
                            }
                        }
                        Err(e) => warn!("Dropping undecodable audio delta: {e:#}"),
                    },

                    ServerEvent::Interrupted => {
                        scheduler.lock().await.interrupt(sink.as_ref());
                    }

                    ServerEvent::Transcript { speaker, text } => {
                        transcript.lock().await.push_delta(speaker, &text);
                    }

                    ServerEvent::ToolCall(call) => {
                        let result = dispatcher.lock().await.dispatch(&call).await;

                        // A result that resolves after the session stopped is
                        // routed to a session id that no longer matches a live
                        // session: discard it instead of writing to the dead
                        // transport.
                        if !active.load(Ordering::SeqCst) {
                            debug!(
                                "Discarding tool result for stopped session (call={})",
                                call.call_id
                            );
                            continue;
                        }

                        let msg = ToolResultMessage {
                            session_id: session_id.clone(),
                            call_id: call.call_id.clone(),
                            name: call.name.clone(),
                            success: result.success,
                            message: result.message,
                        };
                        let guard = remote.lock().await;
                        match guard.as_ref() {
                            Some(session) if session.session_id() == session_id => {
                                if let Err(e) = session.send_tool_result(msg).await {
                                    warn!("Failed to send tool result: {e:#}");
                                }
                            }
                            _ => debug!(
                                "Discarding tool result for mismatched session (call={})",
                                call.call_id
                            ),
                        }
                    }

                    ServerEvent::Error { kind, message } => {
                        match kind {
                            TransportErrorKind::Unauthorized => error!(
                                "Session rejected: credentials invalid, rotate the API key ({})",
                                message
                            ),
                            TransportErrorKind::Connection => {
                                error!("Session transport error: {}", message)
                            }
                        }
                        remote_gone = true;
                        break;
                    }

                    ServerEvent::Closed => {
                        info!("Remote session closed");
                        remote_gone = true;
                        break;
                    }
                }
            }
        }
    }

    // The remote side went away: run the same teardown stop() would, unless
    // a concurrent stop() already claimed it.
    if remote_gone && active.swap(false, Ordering::SeqCst) {
        release_resources(&input, &scheduler, sink.as_ref(), &remote, &dispatcher).await;
    }

    debug!("Session event loop stopped");
}

/// The single teardown path: stop capture, silence playback, close the
/// remote session, abandon any half-filled slot. Callers guard it with the
/// active flag so it runs exactly once per session.
async fn release_resources(
    input: &Mutex<Box<dyn AudioInput>>,
    scheduler: &Mutex<PlaybackScheduler>,
    sink: &dyn AudioSink,
    remote: &Mutex<Option<Box<dyn RemoteSession>>>,
    dispatcher: &Mutex<ToolDispatcher>,
) {
    if let Err(e) = input.lock().await.stop().await {
        warn!("Failed to stop capture device: {e:#}");
    }

    scheduler.lock().await.stop_all(sink);

    if let Some(session) = remote.lock().await.take() {
        if let Err(e) = session.close().await {
            warn!("Failed to close remote session: {e:#}");
        }
    }

    dispatcher.lock().await.clear_slot();
}
