// Shared test doubles: a scriptable remote endpoint, simulated audio
// devices, and a stub promo generator.

#![allow(dead_code)]

use async_trait::async_trait;
use dukaan_voice::{
    AudioDevices, AudioFrameMessage, AudioInput, AudioSink, CaptureBlock, CaptureConfig,
    PromoGenerator, RemoteEndpoint, RemoteSession, ServerEvent, SessionError, SessionSpec,
    SimulatedSink, SourceId, ToolResultMessage,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// What the endpoint and its sessions have observed so far.
#[derive(Default)]
pub struct EndpointLog {
    pub frames: Vec<AudioFrameMessage>,
    pub results: Vec<ToolResultMessage>,
    pub closes: usize,
    pub last_spec: Option<SessionSpec>,
}

/// Remote endpoint double. Tests push `ServerEvent`s through the sender
/// returned by `event_sender` and inspect everything the session sent back
/// through `log`.
pub struct MockEndpoint {
    log: Arc<Mutex<EndpointLog>>,
    synth_error: Mutex<Option<SessionError>>,
    synth_delay: Mutex<Option<Duration>>,
    open_error: Mutex<Option<SessionError>>,
    synth_samples: usize,
    events_tx: Mutex<Option<mpsc::Sender<ServerEvent>>>,
}

impl MockEndpoint {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(EndpointLog::default())),
            synth_error: Mutex::new(None),
            synth_delay: Mutex::new(None),
            open_error: Mutex::new(None),
            synth_samples: 24_000,
            events_tx: Mutex::new(None),
        }
    }

    /// Fail the next `synthesize` call with the given error.
    pub fn fail_synthesis(&self, err: SessionError) {
        *self.synth_error.lock().unwrap() = Some(err);
    }

    /// Make `synthesize` take this long, to widen the window between the
    /// capture device opening and the remote session opening.
    pub fn delay_synthesis(&self, delay: Duration) {
        *self.synth_delay.lock().unwrap() = Some(delay);
    }

    /// Fail the next `open` call with the given error.
    pub fn fail_open(&self, err: SessionError) {
        *self.open_error.lock().unwrap() = Some(err);
    }

    pub fn log(&self) -> Arc<Mutex<EndpointLog>> {
        Arc::clone(&self.log)
    }

    /// Sender for the event channel of the most recently opened session.
    pub fn event_sender(&self) -> mpsc::Sender<ServerEvent> {
        self.events_tx
            .lock()
            .unwrap()
            .clone()
            .expect("no session opened yet")
    }
}

pub struct MockRemoteSession {
    session_id: String,
    log: Arc<Mutex<EndpointLog>>,
}

#[async_trait]
impl RemoteSession for MockRemoteSession {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn send_audio_frame(&self, frame: AudioFrameMessage) -> anyhow::Result<()> {
        self.log.lock().unwrap().frames.push(frame);
        Ok(())
    }

    async fn send_tool_result(&self, result: ToolResultMessage) -> anyhow::Result<()> {
        self.log.lock().unwrap().results.push(result);
        Ok(())
    }

    async fn close(&self) -> anyhow::Result<()> {
        self.log.lock().unwrap().closes += 1;
        Ok(())
    }
}

#[async_trait]
impl RemoteEndpoint for MockEndpoint {
    async fn open(
        &self,
        spec: SessionSpec,
    ) -> Result<(Box<dyn RemoteSession>, mpsc::Receiver<ServerEvent>), SessionError> {
        if let Some(err) = self.open_error.lock().unwrap().take() {
            return Err(err);
        }

        let (tx, rx) = mpsc::channel(64);
        *self.events_tx.lock().unwrap() = Some(tx);

        let session = MockRemoteSession {
            session_id: spec.session_id.clone(),
            log: Arc::clone(&self.log),
        };
        self.log.lock().unwrap().last_spec = Some(spec);

        Ok((Box::new(session), rx))
    }

    async fn synthesize(&self, _text: &str) -> Result<Vec<i16>, SessionError> {
        let delay = self.synth_delay.lock().unwrap().take();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = self.synth_error.lock().unwrap().take() {
            return Err(err);
        }
        Ok(vec![0i16; self.synth_samples])
    }
}

/// Audio device pair for tests: hands out a pre-built input once and a
/// shared `SimulatedSink`.
pub struct SimulatedDevices {
    input: Mutex<Option<Box<dyn AudioInput>>>,
    input_error: Mutex<Option<SessionError>>,
    sink: Arc<SimulatedSink>,
    completions: Mutex<Option<mpsc::UnboundedReceiver<SourceId>>>,
}

impl SimulatedDevices {
    pub fn new(input: Box<dyn AudioInput>) -> Self {
        let (sink, completions) = SimulatedSink::new();
        Self {
            input: Mutex::new(Some(input)),
            input_error: Mutex::new(None),
            sink: Arc::new(sink),
            completions: Mutex::new(Some(completions)),
        }
    }

    /// Fail the next `open_input` call with the given error.
    pub fn fail_input(&self, err: SessionError) {
        *self.input_error.lock().unwrap() = Some(err);
    }

    pub fn sink(&self) -> Arc<SimulatedSink> {
        Arc::clone(&self.sink)
    }
}

#[async_trait]
impl AudioDevices for SimulatedDevices {
    async fn open_input(
        &self,
        _config: &CaptureConfig,
    ) -> Result<Box<dyn AudioInput>, SessionError> {
        if let Some(err) = self.input_error.lock().unwrap().take() {
            return Err(err);
        }
        self.input
            .lock()
            .unwrap()
            .take()
            .ok_or(SessionError::DeviceUnavailable)
    }

    async fn open_output(
        &self,
        _sample_rate: u32,
    ) -> Result<(Arc<dyn AudioSink>, mpsc::UnboundedReceiver<SourceId>), SessionError> {
        let completions = self
            .completions
            .lock()
            .unwrap()
            .take()
            .ok_or(SessionError::DeviceUnavailable)?;
        let sink: Arc<dyn AudioSink> = self.sink.clone();
        Ok((sink, completions))
    }
}

/// Capture backend the test feeds by hand: blocks go in through the returned
/// sender whenever the test wants, so timing against the session start
/// sequence is under the test's control.
pub struct PushInput {
    rx: Option<mpsc::Receiver<CaptureBlock>>,
    capturing: bool,
}

impl PushInput {
    pub fn new() -> (Self, mpsc::Sender<CaptureBlock>) {
        let (tx, rx) = mpsc::channel(64);
        (
            Self {
                rx: Some(rx),
                capturing: false,
            },
            tx,
        )
    }
}

#[async_trait]
impl AudioInput for PushInput {
    async fn start(&mut self) -> Result<mpsc::Receiver<CaptureBlock>, SessionError> {
        let rx = self.rx.take().ok_or(SessionError::DeviceUnavailable)?;
        self.capturing = true;
        Ok(rx)
    }

    async fn stop(&mut self) -> anyhow::Result<()> {
        self.capturing = false;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "push"
    }
}

/// Promo generator that returns a fixed line immediately.
pub struct StubPromo;

#[async_trait]
impl PromoGenerator for StubPromo {
    async fn generate(&self, item_names: &[String]) -> anyhow::Result<String> {
        Ok(format!("Big sale on {}!", item_names.join(", ")))
    }
}

/// Promo generator that always fails, for exercising the no-increment path.
pub struct FailingPromo;

#[async_trait]
impl PromoGenerator for FailingPromo {
    async fn generate(&self, _item_names: &[String]) -> anyhow::Result<String> {
        anyhow::bail!("promo service unavailable")
    }
}
