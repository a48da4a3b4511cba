use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::LifecycleState;
use crate::dispatcher::DispatcherStatus;

/// Snapshot of one call session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    pub call_sid: String,
    pub stream_sid: String,
    pub state: LifecycleState,

    /// Caller language, once the first final transcript has arrived
    pub detected_language: Option<String>,

    pub dispatcher: DispatcherStatus,

    /// When the "start" event was processed
    pub started_at: DateTime<Utc>,

    /// Seconds since `started_at`
    pub duration_secs: f64,

    /// Inbound media frames forwarded to recognition
    pub media_frames: u64,

    pub final_transcripts: u64,

    /// Dispatcher replies played back into the call
    pub playbacks: u64,
}
