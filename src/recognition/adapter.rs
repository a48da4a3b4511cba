use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{AudioEncoding, EngineResult, RecognitionConfig, SpeechRecognizer, Transcript};
use crate::audio::codec::{pcm_to_le_bytes, telephony_to_linear16};

/// What the adapter reports to its session, in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionEvent {
    Transcript(Transcript),
    /// The stream errored or ended on its own; nothing more will arrive
    Failed(String),
}

/// Exclusive handle to one live recognition stream
pub struct RecognitionAdapter {
    encoding: AudioEncoding,
    audio_tx: Option<mpsc::UnboundedSender<Vec<u8>>>,
    ended: Arc<AtomicBool>,
    pump: JoinHandle<()>,
}

impl RecognitionAdapter {
    /// Open a stream on `recognizer` and start pumping its results.
    ///
    /// `sequence` is shared across every adapter a session creates so
    /// transcript numbers keep increasing after a restart.
    pub async fn start(
        recognizer: &dyn SpeechRecognizer,
        config: &RecognitionConfig,
        sequence: Arc<AtomicU64>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<RecognitionEvent>)> {
        let stream = recognizer
            .open(config)
            .await
            .with_context(|| format!("Failed to open {} recognition stream", recognizer.name()))?;

        info!(
            "Recognition stream opened on {} ({}, {} alternatives)",
            recognizer.name(),
            config.primary_language,
            config.alternative_languages.len()
        );

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let ended = Arc::new(AtomicBool::new(false));

        let pump = tokio::spawn(Self::pump(
            stream.results,
            events_tx,
            Arc::clone(&ended),
            sequence,
            config.primary_language.clone(),
        ));

        Ok((
            Self {
                encoding: config.encoding,
                audio_tx: Some(stream.audio),
                ended,
                pump,
            },
            events_rx,
        ))
    }

    /// Forward one chunk of call audio (μ-law). Returns `false` when the
    /// chunk was dropped because the stream has already ended.
    pub fn submit_audio(&self, chunk: Vec<u8>) -> bool {
        if self.is_ended() {
            debug!("Recognition stream ended, dropping {} byte chunk", chunk.len());
            return false;
        }

        let Some(audio_tx) = &self.audio_tx else {
            return false;
        };

        let payload = match self.encoding {
            AudioEncoding::Mulaw => chunk,
            AudioEncoding::Linear16 => pcm_to_le_bytes(&telephony_to_linear16(&chunk)),
        };

        if audio_tx.send(payload).is_err() {
            warn!("Recognition stream closed underneath us, dropping chunk");
            self.ended.store(true, Ordering::SeqCst);
            return false;
        }

        true
    }

    pub fn is_ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }

    /// End the stream. Safe to call more than once.
    pub fn end(&mut self) {
        self.ended.store(true, Ordering::SeqCst);
        if self.audio_tx.take().is_some() {
            debug!("Recognition stream ended");
        }
    }

    async fn pump(
        mut results: mpsc::Receiver<Result<EngineResult>>,
        events: mpsc::UnboundedSender<RecognitionEvent>,
        ended: Arc<AtomicBool>,
        sequence: Arc<AtomicU64>,
        primary_language: String,
    ) {
        while let Some(result) = results.recv().await {
            match result {
                Ok(result) => {
                    let transcript = Transcript {
                        text: result.text,
                        is_final: result.is_final,
                        language_code: result
                            .language_code
                            .unwrap_or_else(|| primary_language.clone()),
                        sequence: sequence.fetch_add(1, Ordering::SeqCst),
                    };
                    if events.send(RecognitionEvent::Transcript(transcript)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    error!("Recognition stream error: {:#}", e);
                    ended.store(true, Ordering::SeqCst);
                    let _ = events.send(RecognitionEvent::Failed(format!("{:#}", e)));
                    return;
                }
            }
        }

        // Ended by the engine rather than by `end()`
        if !ended.swap(true, Ordering::SeqCst) {
            warn!("Recognition stream ended unexpectedly");
            let _ = events.send(RecognitionEvent::Failed(
                "recognition stream ended unexpectedly".to_string(),
            ));
        }
    }
}

impl Drop for RecognitionAdapter {
    fn drop(&mut self) {
        self.end();
        self.pump.abort();
    }
}
