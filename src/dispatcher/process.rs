use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::DispatcherChannel;
use crate::config::DispatcherConfig;
use crate::error::with_timeout;

const EXIT_GRACE: Duration = Duration::from_secs(2);

/// One transcript line written to a dispatcher's stdin
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TranscriptLine<'a> {
    call_sid: &'a str,
    text: &'a str,
}

struct DispatcherProcess {
    child: Child,
    /// Locked per call so a stalled pipe only blocks its own call
    stdin: Option<Arc<Mutex<ChildStdin>>>,
}

/// Launches one external dispatcher program per call.
///
/// The program sees `CALLER_LANGUAGE`, `CALL_SID` and `REPLY_URL` in its
/// environment, reads transcripts as JSON lines on stdin and posts replies
/// to `REPLY_URL`.
pub struct ProcessDispatcher {
    config: DispatcherConfig,
    processes: Mutex<HashMap<String, DispatcherProcess>>,
}

impl ProcessDispatcher {
    pub fn new(config: DispatcherConfig) -> Self {
        Self {
            config,
            processes: Mutex::new(HashMap::new()),
        }
    }

    #[cfg(test)]
    async fn running(&self) -> usize {
        self.processes.lock().await.len()
    }
}

#[async_trait::async_trait]
impl DispatcherChannel for ProcessDispatcher {
    async fn bootstrap(&self, call_id: &str, language: &str) -> Result<()> {
        info!(
            "Launching dispatcher {} for call {} ({})",
            self.config.program, call_id, language
        );

        let mut child = Command::new(&self.config.program)
            .args(&self.config.args)
            .env("CALLER_LANGUAGE", language)
            .env("CALL_SID", call_id)
            .env("REPLY_URL", &self.config.reply_url)
            .stdin(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to launch dispatcher {}", self.config.program))?;

        let stdin = child.stdin.take().map(|stdin| Arc::new(Mutex::new(stdin)));
        let previous = self
            .processes
            .lock()
            .await
            .insert(call_id.to_string(), DispatcherProcess { child, stdin });

        if previous.is_some() {
            warn!("Replaced an existing dispatcher for call {}", call_id);
        }

        Ok(())
    }

    async fn deliver(&self, call_id: &str, text: &str) -> Result<()> {
        let mut line = serde_json::to_vec(&TranscriptLine {
            call_sid: call_id,
            text,
        })?;
        line.push(b'\n');

        let stdin = self
            .processes
            .lock()
            .await
            .get(call_id)
            .and_then(|p| p.stdin.clone())
            .ok_or_else(|| anyhow!("No dispatcher running for call {}", call_id))?;

        with_timeout("dispatcher delivery", self.config.delivery_timeout(), async {
            let mut stdin = stdin.lock().await;
            stdin
                .write_all(&line)
                .await
                .context("Failed to write transcript to dispatcher")?;
            stdin.flush().await?;
            Ok(())
        })
        .await
    }

    async fn release(&self, call_id: &str) {
        let Some(mut process) = self.processes.lock().await.remove(call_id) else {
            return;
        };

        // EOF on stdin is the dispatcher's cue to finish
        drop(process.stdin.take());

        match tokio::time::timeout(EXIT_GRACE, process.child.wait()).await {
            Ok(Ok(status)) => info!("Dispatcher for call {} exited: {}", call_id, status),
            Ok(Err(e)) => warn!("Failed to wait for dispatcher of call {}: {}", call_id, e),
            Err(_) => {
                warn!("Dispatcher for call {} did not exit, killing it", call_id);
                if let Err(e) = process.child.kill().await {
                    warn!("Failed to kill dispatcher of call {}: {}", call_id, e);
                }
            }
        }
    }
}
