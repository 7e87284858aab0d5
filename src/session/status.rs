use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of a voice session's state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    /// Whether the session is currently live
    pub active: bool,

    pub session_id: String,

    /// When the session started
    pub started_at: DateTime<Utc>,

    /// Seconds since the session started
    pub duration_secs: f64,

    /// Audio frames forwarded to the remote session so far
    pub frames_sent: usize,

    /// Merged transcript entries accumulated so far
    pub transcript_entries: usize,
}
