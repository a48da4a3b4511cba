use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

use super::OutboundMedia;

/// Outbound half of a call's media transport.
///
/// The transport's writer task owns the receiving end; releasing the channel
/// drops the last long-lived sender so the writer drains and hangs up.
#[derive(Debug)]
pub struct MediaChannel {
    tx: Mutex<Option<mpsc::Sender<OutboundMedia>>>,
}

impl MediaChannel {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<OutboundMedia>) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            Self {
                tx: Mutex::new(Some(tx)),
            },
            rx,
        )
    }

    /// Sender for one outbound frame, if the channel is still writable
    pub fn sender(&self) -> Option<mpsc::Sender<OutboundMedia>> {
        let guard = self.tx.lock().unwrap_or_else(|e| e.into_inner());
        guard.as_ref().filter(|tx| !tx.is_closed()).cloned()
    }

    pub fn is_open(&self) -> bool {
        self.sender().is_some()
    }

    /// Returns `false` if the channel had already been released
    pub fn release(&self) -> bool {
        let mut guard = self.tx.lock().unwrap_or_else(|e| e.into_inner());
        let released = guard.take().is_some();
        if released {
            debug!("Media channel released");
        }
        released
    }
}
