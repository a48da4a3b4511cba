use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::cloud::read_json;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    transcript: &'a str,
}

/// What the classification service made of one transcript
#[derive(Debug, Clone, Deserialize)]
pub struct Classification {
    #[serde(default, alias = "completion")]
    pub response: Option<String>,

    #[serde(default, alias = "severity_level")]
    pub severity: Option<serde_json::Value>,
}

/// Client for the transcript classification (RAG) service
pub struct ClassifierClient {
    client: reqwest::Client,
    url: String,
}

impl ClassifierClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build classifier HTTP client")?;

        Ok(Self {
            client,
            url: format!("{}/generate", base_url.trim_end_matches('/')),
        })
    }

    pub async fn classify(&self, transcript: &str) -> Result<Classification> {
        let response = self
            .client
            .post(&self.url)
            .json(&GenerateRequest { transcript })
            .send()
            .await
            .context("Classifier request failed")?;

        read_json("classifier", response).await
    }
}
