//! Voice session lifecycle
//!
//! This module provides the session controller and engine:
//! - `VoiceSession`: one live interaction owning the capture pump, the
//!   playback scheduler, the remote session, and the tool dispatcher, with
//!   deterministic teardown on every exit path
//! - `VoiceEngine`: at most one session at a time, toggle semantics, plus
//!   the state that outlives sessions (store, account, selection set)

mod config;
mod controller;
mod engine;
mod status;

pub use config::VoiceSessionConfig;
pub use controller::{SessionDeps, VoiceSession};
pub use engine::{EngineConfig, ToggleOutcome, VoiceEngine};
pub use status::SessionStatus;
