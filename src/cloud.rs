//! Shared plumbing for the HTTP engines (translation, synthesis).

use anyhow::{Context, Result};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::config::EngineConfig;
use crate::error::RelayError;

/// Credentials attached to every engine request
#[derive(Debug, Clone, Default)]
pub struct CloudAuth {
    pub access_token: Option<String>,
    pub api_key: Option<String>,
}

impl CloudAuth {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            access_token: config.access_token.clone(),
            api_key: config.api_key.clone(),
        }
    }

    pub fn apply(&self, mut builder: RequestBuilder) -> RequestBuilder {
        if let Some(token) = &self.access_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(key) = &self.api_key {
            builder = builder.query(&[("key", key)]);
        }
        builder
    }
}

/// Turn a non-2xx response into an engine error, otherwise decode JSON
pub async fn read_json<T: DeserializeOwned>(engine: &'static str, response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(RelayError::engine(engine, format!("HTTP {}: {}", status, body)).into());
    }

    response
        .json::<T>()
        .await
        .with_context(|| format!("Failed to decode {} response", engine))
}
