pub mod capture;
pub mod playback;

use crate::error::SessionError;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

pub use capture::{decode_pcm, encode_block, AudioInput, CaptureBlock, CaptureConfig, ScriptedInput};
pub use playback::{AudioSink, PlaybackScheduler, ScheduledBuffer, SimulatedSink, SourceId};

/// Opens the host's audio devices for one session.
///
/// Acquiring either device is asynchronous and may fail with a classified
/// error (permission denied, no device). Implementations wrap the platform's
/// audio stack; tests provide a simulated pair.
#[async_trait]
pub trait AudioDevices: Send + Sync {
    /// Open the capture device.
    async fn open_input(&self, config: &CaptureConfig) -> Result<Box<dyn AudioInput>, SessionError>;

    /// Open the playback device along with its source-completion channel.
    async fn open_output(
        &self,
        sample_rate: u32,
    ) -> Result<(Arc<dyn AudioSink>, mpsc::UnboundedReceiver<SourceId>), SessionError>;
}

/// Device pair for running without host audio hardware.
///
/// Capture yields no blocks and playback goes to a simulated sink, so a
/// session can be driven entirely over the control plane.
pub struct OfflineDevices;

#[async_trait]
impl AudioDevices for OfflineDevices {
    async fn open_input(
        &self,
        _config: &CaptureConfig,
    ) -> Result<Box<dyn AudioInput>, SessionError> {
        Ok(Box::new(ScriptedInput::new(Vec::new())))
    }

    async fn open_output(
        &self,
        _sample_rate: u32,
    ) -> Result<(Arc<dyn AudioSink>, mpsc::UnboundedReceiver<SourceId>), SessionError> {
        let (sink, completions) = SimulatedSink::new();
        let sink: Arc<dyn AudioSink> = Arc::new(sink);
        Ok((sink, completions))
    }
}
