use thiserror::Error;

/// Failures that threaten session or audio resource integrity.
///
/// Any error of this kind tears the live session down completely. Tool-level
/// validation problems are never represented here; those stay inside a
/// `ToolResult` and are spoken back to the user conversationally.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Microphone access was denied by the user or platform.
    #[error("microphone permission denied")]
    PermissionDenied,

    /// No usable capture device is present.
    #[error("no microphone found")]
    DeviceUnavailable,

    /// The remote endpoint rejected the session with an authorization-class
    /// error. The credentials must be rotated by an administrator; retrying
    /// with the same key will not help.
    #[error("remote credentials rejected: {0}")]
    Unauthorized(String),

    /// Any other connectivity failure. Recoverable by starting a new session.
    #[error("connection error: {0}")]
    Connection(String),
}

impl SessionError {
    /// User-facing status line for this failure class.
    pub fn status_text(&self) -> &'static str {
        match self {
            SessionError::PermissionDenied => "Microphone permission denied.",
            SessionError::DeviceUnavailable => "Audio unavailable. Check settings.",
            SessionError::Unauthorized(_) => {
                "API key invalid or expired. Ask an administrator to update it."
            }
            SessionError::Connection(_) => "Connection error. Start a new session to retry.",
        }
    }

    /// Whether this failure should be retried by simply re-initiating the
    /// session. Authorization failures are not retryable.
    pub fn retryable(&self) -> bool {
        matches!(self, SessionError::Connection(_))
    }
}
