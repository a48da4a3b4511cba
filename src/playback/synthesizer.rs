use anyhow::{Context, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::SpeechSynthesizer;
use crate::audio::{decode_linear16, PcmAudio, LINEAR16_SAMPLE_RATE};
use crate::cloud::{read_json, CloudAuth};
use crate::config::EngineConfig;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    audio_config: AudioConfig,
}

#[derive(Debug, Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    ssml_gender: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: &'static str,
    sample_rate_hertz: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}

/// Cloud Text-to-Speech `text:synthesize` over REST, LINEAR16 at 16kHz
pub struct CloudSynthesizer {
    client: reqwest::Client,
    url: String,
    auth: CloudAuth,
}

impl CloudSynthesizer {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("Failed to build synthesis HTTP client")?;

        Ok(Self {
            client,
            url: format!(
                "{}/v1/text:synthesize",
                config.synthesis_endpoint.trim_end_matches('/')
            ),
            auth: CloudAuth::from_config(config),
        })
    }
}

#[async_trait::async_trait]
impl SpeechSynthesizer for CloudSynthesizer {
    async fn synthesize(&self, text: &str, language: &str) -> Result<PcmAudio> {
        let request = SynthesizeRequest {
            input: SynthesisInput { text },
            voice: VoiceSelection {
                language_code: language,
                ssml_gender: "NEUTRAL",
            },
            audio_config: AudioConfig {
                audio_encoding: "LINEAR16",
                sample_rate_hertz: LINEAR16_SAMPLE_RATE,
            },
        };

        let response = self
            .auth
            .apply(self.client.post(&self.url).json(&request))
            .send()
            .await
            .context("Synthesis request failed")?;

        let body: SynthesizeResponse = read_json("synthesis", response).await?;
        let audio = base64::engine::general_purpose::STANDARD
            .decode(body.audio_content.as_bytes())
            .context("Synthesized audio is not valid base64")?;

        debug!("Synthesized {} bytes for {} chars", audio.len(), text.len());

        decode_linear16(&audio, LINEAR16_SAMPLE_RATE)
    }
}
