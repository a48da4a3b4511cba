//! Speaking dispatcher replies back into a call.

mod injector;
mod synthesizer;

use anyhow::Result;

pub use injector::{PlaybackInjector, PlaybackReport};
pub use synthesizer::CloudSynthesizer;

use crate::audio::PcmAudio;

#[async_trait::async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Render `text` in `language` as linear PCM
    async fn synthesize(&self, text: &str, language: &str) -> Result<PcmAudio>;
}
