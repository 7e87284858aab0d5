use crate::transcript::Speaker;
use serde::{Deserialize, Serialize};

/// Outbound audio frame, one capture block per message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioFrameMessage {
    pub session_id: String,
    pub sequence: u32,
    /// Base64-encoded 16-bit little-endian PCM
    pub pcm: String,
    pub sample_rate: u32,
    pub channels: u16,
    /// RFC3339 timestamp
    pub timestamp: String,
}

/// A structured tool invocation emitted by the conversational model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallMessage {
    pub call_id: String,
    pub name: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

/// Reply to a tool call, sent back into the session so the model can speak
/// the outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResultMessage {
    pub session_id: String,
    pub call_id: String,
    pub name: String,
    pub success: bool,
    pub message: String,
}

/// Transport-level failure classes reported by the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportErrorKind {
    /// Authorization rejected. The credentials must be rotated.
    Unauthorized,
    /// Any other connectivity failure.
    Connection,
}

/// Events delivered by an open remote session.
#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// A chunk of synthesized speech, base64 PCM at the output sample rate.
    AudioDelta { pcm: String },
    /// A streaming transcription delta for either direction.
    Transcript { speaker: Speaker, text: String },
    /// The model wants a tool executed.
    ToolCall(ToolCallMessage),
    /// The user started speaking over the assistant.
    Interrupted,
    /// Transport failure. The session is unusable afterwards.
    Error {
        kind: TransportErrorKind,
        message: String,
    },
    /// The endpoint closed the session.
    Closed,
}
