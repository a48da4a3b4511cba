use anyhow::{anyhow, Context, Result};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use super::{EngineResult, EngineStream, RecognitionConfig, SpeechRecognizer};

/// First frame on every recognition socket
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamingConfig {
    pub encoding: String,
    pub sample_rate_hertz: u32,
    pub language_code: String,
    pub alternative_language_codes: Vec<String>,
    pub interim_results: bool,
    pub enable_automatic_punctuation: bool,
    pub use_enhanced: bool,
}

impl From<&RecognitionConfig> for StreamingConfig {
    fn from(config: &RecognitionConfig) -> Self {
        Self {
            encoding: config.encoding.engine_name().to_string(),
            sample_rate_hertz: config.encoding.sample_rate(),
            language_code: config.primary_language.clone(),
            alternative_language_codes: config.alternative_languages.clone(),
            interim_results: true,
            enable_automatic_punctuation: true,
            use_enhanced: true,
        }
    }
}

/// Result or error frame sent back by the engine
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionMessage {
    #[serde(default)]
    pub transcript: String,
    #[serde(default)]
    pub is_final: bool,
    pub language_code: Option<String>,
    pub error: Option<String>,
}

impl RecognitionMessage {
    fn into_result(self) -> Result<EngineResult> {
        if let Some(error) = self.error {
            return Err(anyhow!(error));
        }
        Ok(EngineResult {
            text: self.transcript,
            is_final: self.is_final,
            language_code: self.language_code,
        })
    }
}

/// Streaming recognizer reached over a WebSocket.
///
/// Protocol: one JSON [`StreamingConfig`] text frame, then binary audio
/// frames; the engine answers with JSON [`RecognitionMessage`] text frames.
pub struct WebSocketRecognizer {
    url: String,
}

impl WebSocketRecognizer {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait::async_trait]
impl SpeechRecognizer for WebSocketRecognizer {
    async fn open(&self, config: &RecognitionConfig) -> Result<EngineStream> {
        let (socket, _) = connect_async(self.url.as_str())
            .await
            .with_context(|| format!("Failed to connect to recognizer at {}", self.url))?;

        let (mut writer, mut reader) = socket.split();

        let streaming_config = serde_json::to_string(&StreamingConfig::from(config))?;
        writer
            .send(Message::Text(streaming_config))
            .await
            .context("Failed to send streaming config")?;

        info!("Connected to recognizer at {}", self.url);

        let (audio_tx, mut audio_rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let (results_tx, results_rx) = mpsc::channel(64);

        tokio::spawn(async move {
            while let Some(chunk) = audio_rx.recv().await {
                if let Err(e) = writer.send(Message::Binary(chunk)).await {
                    warn!("Recognizer socket write failed: {}", e);
                    return;
                }
            }
            debug!("Audio closed, ending recognizer socket");
            let _ = writer.send(Message::Close(None)).await;
        });

        tokio::spawn(async move {
            while let Some(frame) = reader.next().await {
                let result = match frame {
                    Ok(Message::Text(text)) => serde_json::from_str::<RecognitionMessage>(&text)
                        .context("Malformed recognition message")
                        .and_then(RecognitionMessage::into_result),
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => Err(anyhow!("Recognizer socket error: {}", e)),
                };

                let failed = result.is_err();
                if results_tx.send(result).await.is_err() || failed {
                    break;
                }
            }
            debug!("Recognizer socket closed");
        });

        Ok(EngineStream {
            audio: audio_tx,
            results: results_rx,
        })
    }

    fn name(&self) -> &str {
        "websocket"
    }
}
