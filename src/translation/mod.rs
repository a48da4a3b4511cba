//! Conditional translation of final transcripts.

mod cloud;
mod router;

use anyhow::Result;

pub use cloud::CloudTranslator;
pub use router::{RoutedTranscript, TranslationRouter};

#[async_trait::async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, source_language: &str, target_language: &str)
        -> Result<String>;
}
