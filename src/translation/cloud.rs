use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Translator;
use crate::cloud::{read_json, CloudAuth};
use crate::config::EngineConfig;
use crate::error::RelayError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TranslateTextRequest<'a> {
    contents: [&'a str; 1],
    mime_type: &'static str,
    source_language_code: &'a str,
    target_language_code: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranslateTextResponse {
    #[serde(default)]
    translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Translation {
    translated_text: String,
}

/// Cloud Translation v3 `translateText` over REST
pub struct CloudTranslator {
    client: reqwest::Client,
    url: String,
    auth: CloudAuth,
}

impl CloudTranslator {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("Failed to build translation HTTP client")?;

        Ok(Self {
            client,
            url: format!(
                "{}/v3/projects/{}/locations/global:translateText",
                config.translation_endpoint.trim_end_matches('/'),
                config.translation_project
            ),
            auth: CloudAuth::from_config(config),
        })
    }
}

#[async_trait::async_trait]
impl Translator for CloudTranslator {
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String> {
        let request = TranslateTextRequest {
            contents: [text],
            mime_type: "text/plain",
            source_language_code: source_language,
            target_language_code: target_language,
        };

        debug!("Translating {} -> {}", source_language, target_language);

        let response = self
            .auth
            .apply(self.client.post(&self.url).json(&request))
            .send()
            .await
            .context("Translation request failed")?;

        let body: TranslateTextResponse = read_json("translation", response).await?;

        body.translations
            .into_iter()
            .next()
            .map(|t| t.translated_text)
            .ok_or_else(|| RelayError::engine("translation", "empty translations list").into())
    }
}
