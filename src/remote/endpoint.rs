use super::messages::{AudioFrameMessage, ServerEvent, ToolResultMessage};
use crate::dialogue::ToolDeclaration;
use crate::error::SessionError;
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Everything the endpoint needs to open a live conversational session.
#[derive(Debug, Clone)]
pub struct SessionSpec {
    pub session_id: String,
    /// Conversational model identifier.
    pub model: String,
    /// System prompt: category constraints, bilingual handling, two-price
    /// collection rule.
    pub system_prompt: String,
    /// The declared tool set the model may invoke.
    pub tools: Vec<ToolDeclaration>,
    /// Transcribe both user speech and assistant speech.
    pub transcription: bool,
}

/// An open session at the remote conversational endpoint.
#[async_trait]
pub trait RemoteSession: Send + Sync {
    fn session_id(&self) -> &str;

    /// Forward one encoded capture block.
    async fn send_audio_frame(&self, frame: AudioFrameMessage) -> Result<()>;

    /// Report the outcome of a tool call back into the conversation.
    async fn send_tool_result(&self, result: ToolResultMessage) -> Result<()>;

    /// Close the session. Safe to call more than once.
    async fn close(&self) -> Result<()>;
}

/// The remote conversational/model endpoint.
#[async_trait]
pub trait RemoteEndpoint: Send + Sync {
    /// Open a live session. Server events arrive on the returned channel
    /// until the session errors or closes; the channel closing is equivalent
    /// to a `Closed` event.
    async fn open(
        &self,
        spec: SessionSpec,
    ) -> Result<(Box<dyn RemoteSession>, mpsc::Receiver<ServerEvent>), SessionError>;

    /// One-shot speech synthesis, used for the session greeting. Returns
    /// 16-bit PCM at the output sample rate.
    async fn synthesize(&self, text: &str) -> Result<Vec<i16>, SessionError>;
}
