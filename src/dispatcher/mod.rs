//! Dispatcher handoff
//!
//! Outbound: a dispatcher is bootstrapped once per call with the caller's
//! language, then receives the call's routed transcripts.
//! Inbound: the dispatcher's spoken reply arrives as a [`DispatcherReply`]
//! on the control-plane endpoint and is played back into the call.

mod classifier;
mod process;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

pub use classifier::{Classification, ClassifierClient};
pub use process::ProcessDispatcher;

use crate::error::RelayError;

#[async_trait::async_trait]
pub trait DispatcherChannel: Send + Sync {
    /// Start a dispatcher bound to this call
    async fn bootstrap(&self, call_id: &str, language: &str) -> Result<()>;

    /// Hand one routed transcript to the call's dispatcher
    async fn deliver(&self, call_id: &str, text: &str) -> Result<()>;

    /// Tear down whatever `bootstrap` created for the call
    async fn release(&self, call_id: &str);
}

/// Guards the once-per-session dispatcher launch
#[derive(Debug, Default)]
pub struct BootstrapGuard {
    bootstrapped: AtomicBool,
}

impl BootstrapGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` for exactly one caller over the guard's lifetime
    pub fn try_acquire(&self) -> bool {
        self.bootstrapped
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_bootstrapped(&self) -> bool {
        self.bootstrapped.load(Ordering::Acquire)
    }
}

/// Progress of a call's dispatcher launch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatcherStatus {
    NotStarted,
    Launching,
    Ready,
    Failed,
}

/// Reply posted by a dispatcher for one call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatcherReply {
    #[serde(default)]
    pub text: String,

    /// Synthesis language; empty means "the caller's detected language"
    #[serde(default)]
    pub language: String,

    /// Target call; absent means "the only live call", if there is exactly one
    #[serde(default)]
    pub call_sid: Option<String>,
}

impl DispatcherReply {
    /// Reject payloads that cannot produce any playback
    pub fn validate(self) -> Result<Self, RelayError> {
        if self.text.trim().is_empty() {
            return Err(RelayError::InvalidPayload(
                "text must be a non-empty string".to_string(),
            ));
        }
        Ok(self)
    }
}
