use crate::session::VoiceEngine;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The one voice engine for this shopkeeper
    pub engine: Arc<VoiceEngine>,
}

impl AppState {
    pub fn new(engine: Arc<VoiceEngine>) -> Self {
        Self { engine }
    }
}
