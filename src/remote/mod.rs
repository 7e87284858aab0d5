//! The wire contract with the remote conversational endpoint: session
//! opening, outbound audio frames, inbound server events, and tool results.

mod endpoint;
mod messages;
mod offline;

pub use endpoint::{RemoteEndpoint, RemoteSession, SessionSpec};
pub use offline::OfflineEndpoint;
pub use messages::{
    AudioFrameMessage, ServerEvent, ToolCallMessage, ToolResultMessage, TransportErrorKind,
};
