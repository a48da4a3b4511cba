use anyhow::Result;
use std::sync::Arc;

use super::SessionRegistry;
use crate::config::{Config, PipelineConfig};
use crate::dispatcher::{ClassifierClient, DispatcherChannel, ProcessDispatcher};
use crate::recognition::{RecognitionConfig, SpeechRecognizer, WebSocketRecognizer};
use crate::translation::{CloudTranslator, TranslationRouter};

/// Everything a call session needs besides its own transport.
///
/// One pipeline serves every call; which steps run (translation, dispatcher,
/// classification) is decided by what is plugged in here.
pub struct Pipeline {
    pub config: PipelineConfig,
    pub recognizer: Arc<dyn SpeechRecognizer>,
    pub router: Arc<TranslationRouter>,
    pub dispatcher: Option<Arc<dyn DispatcherChannel>>,
    pub classifier: Option<Arc<ClassifierClient>>,
    pub registry: Arc<SessionRegistry>,
}

impl Pipeline {
    /// Minimal pipeline: recognition only, transcripts pass through untranslated
    pub fn new(config: PipelineConfig, recognizer: Arc<dyn SpeechRecognizer>) -> Self {
        Self {
            config,
            recognizer,
            router: Arc::new(TranslationRouter::passthrough()),
            dispatcher: None,
            classifier: None,
            registry: Arc::new(SessionRegistry::new()),
        }
    }

    pub fn with_router(mut self, router: TranslationRouter) -> Self {
        self.router = Arc::new(router);
        self
    }

    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn DispatcherChannel>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn with_classifier(mut self, classifier: ClassifierClient) -> Self {
        self.classifier = Some(Arc::new(classifier));
        self
    }

    pub fn with_registry(mut self, registry: Arc<SessionRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Wire the production engines named in `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        let recognizer = Arc::new(WebSocketRecognizer::new(&config.engines.recognition_url));
        let mut pipeline = Self::new(config.pipeline.clone(), recognizer);

        if config.pipeline.translation_enabled {
            let translator = Arc::new(CloudTranslator::new(&config.engines)?);
            pipeline = pipeline.with_router(TranslationRouter::new(
                translator,
                config.engines.request_timeout(),
            ));
        }

        if config.pipeline.dispatcher_enabled {
            pipeline = pipeline.with_dispatcher(Arc::new(ProcessDispatcher::new(
                config.dispatcher.clone(),
            )));
        }

        if let Some(url) = &config.classifier.url {
            pipeline = pipeline.with_classifier(ClassifierClient::new(
                url,
                config.engines.request_timeout(),
            )?);
        }

        Ok(pipeline)
    }

    pub fn recognition_config(&self) -> RecognitionConfig {
        RecognitionConfig {
            encoding: self.config.recognition_encoding,
            primary_language: self.config.primary_language.clone(),
            alternative_languages: self.config.alternative_languages.clone(),
        }
    }
}
