use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::sync::watch;

use super::{LifecycleState, SessionStats};
use crate::dispatcher::{BootstrapGuard, DispatcherStatus};
use crate::media::MediaChannel;

/// Shared view of a live call, handed out by the session registry.
///
/// Only the owning `CallSession` changes lifecycle state or writes the
/// detected language; everyone else reads, plays audio, or counts.
#[derive(Clone)]
pub struct CallHandle {
    inner: Arc<CallShared>,
}

struct CallShared {
    call_sid: String,
    stream_sid: String,
    started_at: DateTime<Utc>,
    media: Arc<MediaChannel>,
    state: watch::Receiver<LifecycleState>,
    detected_language: OnceLock<String>,
    bootstrap: BootstrapGuard,
    dispatcher: watch::Sender<DispatcherStatus>,
    media_frames: AtomicU64,
    final_transcripts: AtomicU64,
    playbacks: AtomicU64,
}

impl CallHandle {
    pub fn new(
        call_sid: impl Into<String>,
        stream_sid: impl Into<String>,
        media: Arc<MediaChannel>,
        state: watch::Receiver<LifecycleState>,
    ) -> Self {
        let (dispatcher, _) = watch::channel(DispatcherStatus::NotStarted);
        Self {
            inner: Arc::new(CallShared {
                call_sid: call_sid.into(),
                stream_sid: stream_sid.into(),
                started_at: Utc::now(),
                media,
                state,
                detected_language: OnceLock::new(),
                bootstrap: BootstrapGuard::new(),
                dispatcher,
                media_frames: AtomicU64::new(0),
                final_transcripts: AtomicU64::new(0),
                playbacks: AtomicU64::new(0),
            }),
        }
    }

    pub fn call_sid(&self) -> &str {
        &self.inner.call_sid
    }

    pub fn stream_sid(&self) -> &str {
        &self.inner.stream_sid
    }

    pub fn state(&self) -> LifecycleState {
        *self.inner.state.borrow()
    }

    /// Wait until the session reaches `target` (or its state source goes away)
    pub async fn wait_for_state(&self, target: LifecycleState) -> LifecycleState {
        let mut rx = self.inner.state.clone();
        let reached = rx.wait_for(|s| *s == target).await.map(|s| *s);
        match reached {
            Ok(state) => state,
            Err(_) => *rx.borrow(),
        }
    }

    pub fn media(&self) -> &MediaChannel {
        &self.inner.media
    }

    /// Playback may write only while streaming over an open channel
    pub fn is_writable(&self) -> bool {
        self.state().accepts_audio() && self.inner.media.is_open()
    }

    pub fn detected_language(&self) -> Option<&str> {
        self.inner.detected_language.get().map(String::as_str)
    }

    /// First writer wins; returns the language in effect afterwards
    pub(crate) fn detect_language(&self, language: &str) -> &str {
        self.inner
            .detected_language
            .get_or_init(|| language.to_string())
    }

    pub fn bootstrap_guard(&self) -> &BootstrapGuard {
        &self.inner.bootstrap
    }

    pub fn dispatcher_status(&self) -> DispatcherStatus {
        *self.inner.dispatcher.borrow()
    }

    pub(crate) fn set_dispatcher_status(&self, status: DispatcherStatus) {
        self.inner.dispatcher.send_replace(status);
    }

    /// Wait for an in-progress launch to settle
    pub async fn dispatcher_settled(&self) -> DispatcherStatus {
        let mut rx = self.inner.dispatcher.subscribe();
        let settled = rx
            .wait_for(|s| *s != DispatcherStatus::Launching)
            .await
            .map(|s| *s);
        settled.unwrap_or(DispatcherStatus::Failed)
    }

    pub(crate) fn record_media_frame(&self) {
        self.inner.media_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_final_transcript(&self) {
        self.inner.final_transcripts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_playback(&self) {
        self.inner.playbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> SessionStats {
        let duration = Utc::now().signed_duration_since(self.inner.started_at);
        SessionStats {
            call_sid: self.inner.call_sid.clone(),
            stream_sid: self.inner.stream_sid.clone(),
            state: self.state(),
            detected_language: self.detected_language().map(str::to_string),
            dispatcher: self.dispatcher_status(),
            started_at: self.inner.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            media_frames: self.inner.media_frames.load(Ordering::Relaxed),
            final_transcripts: self.inner.final_transcripts.load(Ordering::Relaxed),
            playbacks: self.inner.playbacks.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for CallHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallHandle")
            .field("call_sid", &self.inner.call_sid)
            .field("stream_sid", &self.inner.stream_sid)
            .field("state", &self.state())
            .finish()
    }
}
