use serde::{Deserialize, Serialize};

/// Configuration for one voice session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceSessionConfig {
    /// Unique session identifier (e.g. "voice-<uuid>")
    pub session_id: String,

    /// Conversational model identifier at the remote endpoint
    pub model: String,

    /// Capture sample rate in Hz (the endpoint expects 16kHz mono)
    pub input_sample_rate: u32,

    /// Playback sample rate in Hz (the endpoint emits 24kHz speech)
    pub output_sample_rate: u32,

    /// Frames per capture block
    pub capture_block_frames: usize,

    /// Greeting synthesized and played before the live session opens
    pub greeting: String,
}

impl Default for VoiceSessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("voice-{}", uuid::Uuid::new_v4()),
            model: "realtime-audio-v1".to_string(),
            input_sample_rate: 16_000,
            output_sample_rate: 24_000,
            capture_block_frames: 4096,
            greeting: "Hello, how can I help you?".to_string(),
        }
    }
}
