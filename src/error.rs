//! Typed failures the relay branches on.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("{operation} timed out after {elapsed:?}")]
    Timeout {
        operation: &'static str,
        elapsed: Duration,
    },

    #[error("Media channel closed")]
    ChannelClosed,

    #[error("{engine} engine error: {message}")]
    Engine {
        engine: &'static str,
        message: String,
    },

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

impl RelayError {
    pub fn engine(engine: &'static str, message: impl Into<String>) -> Self {
        Self::Engine {
            engine,
            message: message.into(),
        }
    }
}

/// Run `fut` under `limit`, turning an elapsed deadline into [`RelayError::Timeout`].
pub async fn with_timeout<T, F>(operation: &'static str, limit: Duration, fut: F) -> anyhow::Result<T>
where
    F: std::future::Future<Output = anyhow::Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(RelayError::Timeout {
            operation,
            elapsed: limit,
        }
        .into()),
    }
}
