use base64::Engine;
use serde::{Deserialize, Serialize};

/// Frames the telephony transport sends over the media WebSocket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum InboundMessage {
    Connected,
    Start {
        start: StartMetadata,
    },
    Media {
        media: MediaPayload,
    },
    Stop,
    /// Marks, dtmf and anything newer than this relay
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartMetadata {
    pub stream_sid: String,
    pub call_sid: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaPayload {
    /// Base64-encoded μ-law audio
    pub payload: String,
}

/// Playback frame sent back into the call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMedia {
    pub event: String,
    pub stream_sid: String,
    pub media: MediaPayload,
}

impl OutboundMedia {
    pub fn new(stream_sid: impl Into<String>, payload: String) -> Self {
        Self {
            event: "media".to_string(),
            stream_sid: stream_sid.into(),
            media: MediaPayload { payload },
        }
    }

    /// Frame carrying raw μ-law bytes
    pub fn mulaw(stream_sid: impl Into<String>, audio: &[u8]) -> Self {
        Self::new(
            stream_sid,
            base64::engine::general_purpose::STANDARD.encode(audio),
        )
    }
}
