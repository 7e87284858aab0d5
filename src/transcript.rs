use serde::{Deserialize, Serialize};

/// Which side of the conversation produced a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

/// One merged utterance in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub speaker: Speaker,
    pub text: String,
}

/// Accumulates streaming transcription deltas into per-speaker utterances.
///
/// A delta from the same speaker as the most recent entry is appended to that
/// entry; a speaker change starts a new one. Both directions share the same
/// sequence, so ordering follows delta arrival.
#[derive(Debug, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_delta(&mut self, speaker: Speaker, delta: &str) {
        match self.entries.last_mut() {
            Some(last) if last.speaker == speaker => last.text.push_str(delta),
            _ => self.entries.push(TranscriptEntry {
                speaker,
                text: delta.to_string(),
            }),
        }
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
