//! Telephony media transport: wire frames and the decoded event stream a
//! call session consumes.

pub mod channel;
pub mod messages;

use anyhow::{Context, Result};
use base64::Engine;

pub use channel::MediaChannel;
pub use messages::{InboundMessage, MediaPayload, OutboundMedia, StartMetadata};

/// Decoded transport event, in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    Connected,
    Start { stream_sid: String, call_sid: String },
    /// Raw μ-law bytes
    Media(Vec<u8>),
    Stop,
    /// The transport failed; the session closes without retrying it
    TransportError(String),
}

impl MediaEvent {
    /// Parse one JSON text frame. `Ok(None)` for frames the relay ignores.
    pub fn parse(text: &str) -> Result<Option<Self>> {
        let msg: InboundMessage =
            serde_json::from_str(text).context("Malformed media frame")?;

        Ok(match msg {
            InboundMessage::Connected => Some(Self::Connected),
            InboundMessage::Start { start } => Some(Self::Start {
                stream_sid: start.stream_sid,
                call_sid: start.call_sid,
            }),
            InboundMessage::Media { media } => {
                let audio = base64::engine::general_purpose::STANDARD
                    .decode(media.payload.as_bytes())
                    .context("Media payload is not valid base64")?;
                Some(Self::Media(audio))
            }
            InboundMessage::Stop => Some(Self::Stop),
            InboundMessage::Unknown => None,
        })
    }
}

/// Text of the JSON frame the socket writer sends
pub fn encode_outbound(frame: &OutboundMedia) -> Result<String> {
    serde_json::to_string(frame).context("Failed to serialize media frame")
}
