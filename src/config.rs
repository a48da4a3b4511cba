use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

use crate::recognition::AudioEncoding;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub pipeline: PipelineConfig,
    pub engines: EngineConfig,
    pub dispatcher: DispatcherConfig,
    pub classifier: ClassifierConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "call-relay".to_string(),
            http: HttpConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Knobs shared by every call handled by this process.
///
/// One pipeline covers every language/translation/dispatch combination; the
/// direction of translation is `caller language -> target_language`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Language the recognizer assumes first
    pub primary_language: String,

    /// Candidate languages the recognizer may pick instead of the primary one
    pub alternative_languages: Vec<String>,

    /// Language downstream consumers (dispatcher, classifier) expect
    pub target_language: String,

    pub translation_enabled: bool,
    pub dispatcher_enabled: bool,

    /// Encoding handed to the recognition engine
    pub recognition_encoding: AudioEncoding,

    /// Media frames kept while waiting for the "start" event
    pub pre_start_buffer_frames: usize,

    /// How long a stopped session waits for the transport to hang up
    pub close_grace_ms: u64,

    /// Recognition handles recreated after a failure before the call is dropped
    pub max_recognition_restarts: u32,

    /// Bytes of telephony audio per outbound media frame (160 = 20ms)
    pub playback_chunk_bytes: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            primary_language: "en-US".to_string(),
            alternative_languages: vec![
                "hi-IN".to_string(),
                "es-ES".to_string(),
                "fr-FR".to_string(),
                "de-DE".to_string(),
            ],
            target_language: "en-US".to_string(),
            translation_enabled: true,
            dispatcher_enabled: true,
            recognition_encoding: AudioEncoding::Mulaw,
            pre_start_buffer_frames: 50,
            close_grace_ms: 2000,
            max_recognition_restarts: 1,
            playback_chunk_bytes: 160,
        }
    }
}

impl PipelineConfig {
    pub fn close_grace(&self) -> Duration {
        Duration::from_millis(self.close_grace_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// WebSocket URL of the streaming recognizer
    pub recognition_url: String,
    pub translation_endpoint: String,
    pub translation_project: String,
    pub synthesis_endpoint: String,
    pub access_token: Option<String>,
    pub api_key: Option<String>,

    /// Upper bound for a single translation or synthesis call
    pub request_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            recognition_url: "ws://localhost:8090/recognize".to_string(),
            translation_endpoint: "https://translation.googleapis.com".to_string(),
            translation_project: String::new(),
            synthesis_endpoint: "https://texttospeech.googleapis.com".to_string(),
            access_token: None,
            api_key: None,
            request_timeout_ms: 10_000,
        }
    }
}

impl EngineConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Program launched once per call
    pub program: String,
    pub args: Vec<String>,

    /// Where the dispatcher posts its replies
    pub reply_url: String,

    /// Longest a transcript write may wait on a dispatcher's stdin
    pub delivery_timeout_ms: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            program: "call-dispatcher".to_string(),
            args: Vec::new(),
            reply_url: "http://localhost:3000/dispatcher-response".to_string(),
            delivery_timeout_ms: 5000,
        }
    }
}

impl DispatcherConfig {
    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_millis(self.delivery_timeout_ms)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Base URL of the classification service; unset disables forwarding
    pub url: Option<String>,
}

impl Config {
    /// Load from a TOML file (extension optional) with `RELAY__` env overrides.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("RELAY").separator("__"))
            .build()
            .with_context(|| format!("Failed to read config from {}", path))?;

        settings
            .try_deserialize()
            .context("Failed to deserialize config")
    }
}
