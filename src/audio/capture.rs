use crate::error::SessionError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use tokio::sync::mpsc;

/// One block of raw microphone samples, as delivered by a capture callback.
#[derive(Debug, Clone)]
pub struct CaptureBlock {
    /// Mono float samples in [-1.0, 1.0].
    pub samples: Vec<f32>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

/// Capture device configuration.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Capture sample rate in Hz.
    pub sample_rate: u32,
    /// Frames per capture block.
    pub block_frames: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            block_frames: 4096,
        }
    }
}

/// Audio capture backend.
///
/// Push-driven: `start` hands back a channel the device fills one block at a
/// time as samples become available. Implementations wrap real microphones;
/// `ScriptedInput` replays a fixed sequence for tests and offline runs.
#[async_trait]
pub trait AudioInput: Send + Sync {
    /// Start capturing.
    ///
    /// Returns the channel that will receive capture blocks. The channel
    /// closes when the device stops.
    async fn start(&mut self) -> Result<mpsc::Receiver<CaptureBlock>, SessionError>;

    /// Stop capturing and release the device.
    async fn stop(&mut self) -> Result<()>;

    /// Whether the device is currently capturing.
    fn is_capturing(&self) -> bool;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

/// Scale float samples to 16-bit PCM and base64-encode the little-endian
/// bytes, producing the payload the remote session accepts.
pub fn encode_block(samples: &[f32]) -> String {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &s in samples {
        let v = (s * 32768.0).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Decode a base64 PCM payload back into 16-bit samples. A trailing odd byte
/// is discarded.
pub fn decode_pcm(payload: &str) -> Result<Vec<i16>> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .context("invalid base64 PCM payload")?;

    Ok(bytes
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect())
}

/// Capture backend that replays a fixed sequence of blocks and then closes
/// its channel. Stands in for a microphone when no hardware is present.
pub struct ScriptedInput {
    blocks: Vec<CaptureBlock>,
    fail_with: Option<SessionError>,
    capturing: bool,
}

impl ScriptedInput {
    pub fn new(blocks: Vec<CaptureBlock>) -> Self {
        Self {
            blocks,
            fail_with: None,
            capturing: false,
        }
    }

    /// A device that fails to open with the given error, for exercising the
    /// session-start failure paths.
    pub fn failing(err: SessionError) -> Self {
        Self {
            blocks: Vec::new(),
            fail_with: Some(err),
            capturing: false,
        }
    }
}

#[async_trait]
impl AudioInput for ScriptedInput {
    async fn start(&mut self) -> Result<mpsc::Receiver<CaptureBlock>, SessionError> {
        if let Some(err) = self.fail_with.take() {
            return Err(err);
        }

        let (tx, rx) = mpsc::channel(64);
        let blocks = std::mem::take(&mut self.blocks);

        tokio::spawn(async move {
            for block in blocks {
                if tx.send(block).await.is_err() {
                    break;
                }
            }
        });

        self.capturing = true;
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.capturing = false;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
