use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use super::SpeechSynthesizer;
use crate::audio::linear16_to_telephony;
use crate::error::{with_timeout, RelayError};
use crate::media::OutboundMedia;
use crate::session::CallHandle;

/// Outcome of one completed playback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackReport {
    pub playback_id: Uuid,
    pub chunks_sent: usize,
    pub bytes_sent: usize,
}

/// Synthesizes replies and streams them into a call as media frames
pub struct PlaybackInjector {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    timeout: Duration,
    chunk_bytes: usize,
}

impl PlaybackInjector {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, timeout: Duration, chunk_bytes: usize) -> Self {
        Self {
            synthesizer,
            timeout,
            chunk_bytes: chunk_bytes.max(1),
        }
    }

    /// Speak `text` into `call`.
    ///
    /// Synthesis failure means nothing is sent. Once streaming starts, the
    /// first chunk that cannot be written aborts the rest of the reply.
    pub async fn play(&self, call: &CallHandle, text: &str, language: &str) -> Result<PlaybackReport> {
        let playback_id = Uuid::new_v4();
        info!(
            "Playback {} for call {} ({}): {}",
            playback_id,
            call.call_sid(),
            language,
            text
        );

        let audio = with_timeout(
            "synthesis",
            self.timeout,
            self.synthesizer.synthesize(text, language),
        )
        .await
        .context("Speech synthesis failed")?;

        let mulaw = linear16_to_telephony(&audio);
        let total_chunks = mulaw.len().div_ceil(self.chunk_bytes);
        let mut report = PlaybackReport {
            playback_id,
            chunks_sent: 0,
            bytes_sent: 0,
        };

        for chunk in mulaw.chunks(self.chunk_bytes) {
            let sender = match call.media().sender() {
                Some(sender) if call.is_writable() => sender,
                _ => {
                    warn!(
                        "Playback {} aborted after {}/{} chunks: media channel not writable",
                        playback_id, report.chunks_sent, total_chunks
                    );
                    return Err(RelayError::ChannelClosed.into());
                }
            };

            let frame = OutboundMedia::mulaw(call.stream_sid(), chunk);

            if sender.send(frame).await.is_err() {
                warn!(
                    "Playback {} aborted after {}/{} chunks: send failed",
                    playback_id, report.chunks_sent, total_chunks
                );
                return Err(RelayError::ChannelClosed.into());
            }

            report.chunks_sent += 1;
            report.bytes_sent += chunk.len();
        }

        call.record_playback();
        info!(
            "Playback {} complete: {} chunks, {:.2}s of audio",
            playback_id,
            report.chunks_sent,
            audio.duration_secs()
        );

        Ok(report)
    }
}
