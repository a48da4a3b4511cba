use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::CallHandle;

/// Live calls by call sid.
///
/// The single authority inbound dispatcher replies consult to find the call
/// they belong to. Sessions register on "start" and unregister on close.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, CallHandle>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, call: CallHandle) {
        let call_sid = call.call_sid().to_string();
        let previous = self.sessions.write().await.insert(call_sid.clone(), call);
        if previous.is_some() {
            warn!("Call {} re-registered; replacing previous session", call_sid);
        }
        debug!("Registered call {}", call_sid);
    }

    /// Remove `call` only if it is still the registered session for its sid
    pub async fn unregister(&self, call: &CallHandle) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get(call.call_sid()) {
            Some(current) if current.stream_sid() == call.stream_sid() => {
                sessions.remove(call.call_sid());
                debug!("Unregistered call {}", call.call_sid());
                true
            }
            _ => false,
        }
    }

    pub async fn get(&self, call_sid: &str) -> Option<CallHandle> {
        self.sessions.read().await.get(call_sid).cloned()
    }

    /// Look up by sid, or fall back to the only live call when no sid is given
    pub async fn resolve(&self, call_sid: Option<&str>) -> Option<CallHandle> {
        let sessions = self.sessions.read().await;
        match call_sid {
            Some(sid) => sessions.get(sid).cloned(),
            None if sessions.len() == 1 => sessions.values().next().cloned(),
            None => None,
        }
    }

    pub async fn call_sids(&self) -> Vec<String> {
        let mut sids: Vec<String> = self.sessions.read().await.keys().cloned().collect();
        sids.sort();
        sids
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
