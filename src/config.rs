use crate::usage::Plan;
use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub audio: AudioConfig,
    pub assistant: AssistantConfig,
    pub shop: ShopConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    /// Capture sample rate in Hz (the remote endpoint expects 16kHz mono)
    pub input_sample_rate: u32,
    /// Playback sample rate in Hz (the endpoint emits 24kHz speech)
    pub output_sample_rate: u32,
    /// Frames per capture block
    pub capture_block_frames: usize,
}

#[derive(Debug, Deserialize)]
pub struct AssistantConfig {
    /// Conversational model identifier at the remote endpoint
    pub model: String,
    /// Greeting synthesized and played when a session starts
    pub greeting: String,
}

#[derive(Debug, Deserialize)]
pub struct ShopConfig {
    /// Inventory categories the assistant is constrained to
    pub categories: Vec<String>,
    /// Subscription tier of the shopkeeper account
    pub plan: Plan,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
