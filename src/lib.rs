pub mod audio;
pub mod config;
pub mod dialogue;
pub mod error;
pub mod http;
pub mod inventory;
pub mod remote;
pub mod session;
pub mod transcript;
pub mod usage;

pub use audio::{
    decode_pcm, encode_block, AudioDevices, AudioInput, AudioSink, CaptureBlock, CaptureConfig,
    OfflineDevices, PlaybackScheduler, ScriptedInput, SimulatedSink, SourceId,
};
pub use config::Config;
pub use dialogue::{
    build_system_prompt, declarations, DialogueSlot, PromoGenerator, PromoNotice, SelectionSet,
    TemplatePromo, ToolDeclaration, ToolDispatcher, ToolResult,
};
pub use error::SessionError;
pub use http::{create_router, AppState};
pub use inventory::{InventoryStore, Item, ItemUpdate, MemoryStore, RemoveOutcome, SaleRecord};
pub use remote::{
    AudioFrameMessage, OfflineEndpoint, RemoteEndpoint, RemoteSession, ServerEvent, SessionSpec,
    ToolCallMessage, ToolResultMessage, TransportErrorKind,
};
pub use session::{
    EngineConfig, SessionDeps, SessionStatus, ToggleOutcome, VoiceEngine, VoiceSession,
    VoiceSessionConfig,
};
pub use transcript::{Speaker, Transcript, TranscriptEntry};
pub use usage::{Account, Feature, Plan, UsageCounters};
