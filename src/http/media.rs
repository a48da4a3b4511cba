use super::state::AppState;
use crate::media::{encode_outbound, MediaChannel, MediaEvent};
use crate::session::CallSession;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, info_span, warn, Instrument};

/// Outbound frames queued ahead of the socket writer
const OUTBOUND_QUEUE_FRAMES: usize = 64;

/// GET /media
/// Upgrade to the telephony media stream; one call per connection
pub async fn media_stream(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        let span = info_span!("call", call_sid = tracing::field::Empty);
        serve_media(socket, state).instrument(span)
    })
}

async fn serve_media(socket: WebSocket, state: AppState) {
    info!("Media connection established");
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (media, mut outbound) = MediaChannel::new(OUTBOUND_QUEUE_FRAMES);
    let (events_tx, events_rx) = mpsc::unbounded_channel();

    // Writer: drains playback frames until the channel is released
    let writer = tokio::spawn(
        async move {
            while let Some(frame) = outbound.recv().await {
                let text = match encode_outbound(&frame) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("{:#}", e);
                        continue;
                    }
                };
                if ws_sender.send(Message::Text(text)).await.is_err() {
                    warn!("Media socket closed while writing");
                    break;
                }
            }
            let _ = ws_sender.close().await;
        }
        .in_current_span(),
    );

    // Reader: decodes frames into session events, in arrival order
    let reader = tokio::spawn(
        async move {
            while let Some(message) = ws_receiver.next().await {
                match message {
                    Ok(Message::Text(text)) => match MediaEvent::parse(&text) {
                        Ok(Some(event)) => {
                            if events_tx.send(event).is_err() {
                                break;
                            }
                        }
                        Ok(None) => debug!("Ignoring unrecognized media frame"),
                        Err(e) => warn!("Skipping media frame: {:#}", e),
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        let _ = events_tx.send(MediaEvent::TransportError(e.to_string()));
                        break;
                    }
                }
            }
        }
        .in_current_span(),
    );

    let session = CallSession::new(Arc::clone(&state.pipeline), Arc::new(media));
    let final_state = session.run(events_rx).await;

    reader.abort();
    let _ = writer.await;
    info!("Media connection finished ({:?})", final_state);
}
