use serde::{Deserialize, Serialize};

/// Where a call session is in its life
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Transport up, waiting for the "start" event
    Connecting,
    Streaming,
    /// Stop received; releasing recognition and media
    Closing,
    Closed,
}

impl LifecycleState {
    pub fn accepts_audio(self) -> bool {
        matches!(self, Self::Streaming)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed)
    }
}
