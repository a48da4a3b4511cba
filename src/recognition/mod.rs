//! Continuous speech recognition
//!
//! - `SpeechRecognizer`: an engine that opens one streaming recognition
//!   per call leg (audio in, ordered results out)
//! - `RecognitionAdapter`: per-session wrapper that numbers transcripts,
//!   drops audio after the stream ends and reports failures as events
//! - `WebSocketRecognizer`: engine speaking JSON/binary over a WebSocket

mod adapter;
mod websocket;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

pub use adapter::{RecognitionAdapter, RecognitionEvent};
pub use websocket::WebSocketRecognizer;

use crate::audio::{LINEAR16_SAMPLE_RATE, TELEPHONY_SAMPLE_RATE};

/// Audio encoding handed to the recognition engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioEncoding {
    /// Call audio passed through untouched (8kHz μ-law)
    Mulaw,
    /// Call audio transcoded to 16kHz linear PCM
    Linear16,
}

impl AudioEncoding {
    pub fn sample_rate(self) -> u32 {
        match self {
            Self::Mulaw => TELEPHONY_SAMPLE_RATE,
            Self::Linear16 => LINEAR16_SAMPLE_RATE,
        }
    }

    pub fn engine_name(self) -> &'static str {
        match self {
            Self::Mulaw => "MULAW",
            Self::Linear16 => "LINEAR16",
        }
    }
}

/// Parameters fixed for the lifetime of one recognition stream
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionConfig {
    pub encoding: AudioEncoding,
    pub primary_language: String,
    pub alternative_languages: Vec<String>,
}

/// One recognition result, numbered per session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    pub is_final: bool,
    pub language_code: String,
    pub sequence: u64,
}

/// Raw result as produced by an engine, before numbering
#[derive(Debug, Clone, PartialEq)]
pub struct EngineResult {
    pub text: String,
    pub is_final: bool,
    /// Language the engine settled on, when it reports one
    pub language_code: Option<String>,
}

/// Live engine stream: audio goes in, results come out in engine order.
///
/// Dropping `audio` ends the stream; the engine then closes `results`.
pub struct EngineStream {
    pub audio: mpsc::UnboundedSender<Vec<u8>>,
    pub results: mpsc::Receiver<Result<EngineResult>>,
}

#[async_trait::async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Open a new streaming recognition
    async fn open(&self, config: &RecognitionConfig) -> Result<EngineStream>;

    /// Engine name for logging
    fn name(&self) -> &str;
}
