use futures::stream::{FuturesOrdered, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::Translator;
use crate::error::with_timeout;
use crate::recognition::Transcript;

/// Final transcript text ready for downstream consumers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedTranscript {
    pub sequence: u64,
    pub text: String,
    pub source_language: String,
    pub translated: bool,
}

/// Decides per transcript whether translation is needed and performs it.
///
/// Without a translator every final transcript passes through untouched.
pub struct TranslationRouter {
    translator: Option<Arc<dyn Translator>>,
    timeout: Duration,
}

impl TranslationRouter {
    pub fn new(translator: Arc<dyn Translator>, timeout: Duration) -> Self {
        Self {
            translator: Some(translator),
            timeout,
        }
    }

    pub fn passthrough() -> Self {
        Self {
            translator: None,
            timeout: Duration::ZERO,
        }
    }

    /// Route a single transcript. `None` means nothing goes downstream.
    pub async fn route(&self, transcript: &Transcript, target_language: &str) -> Option<RoutedTranscript> {
        if !transcript.is_final {
            debug!("Interim transcript #{}: {}", transcript.sequence, transcript.text);
            return None;
        }

        let same_language = transcript
            .language_code
            .eq_ignore_ascii_case(target_language);

        let translator = match &self.translator {
            Some(translator) if !same_language => translator,
            _ => {
                return Some(RoutedTranscript {
                    sequence: transcript.sequence,
                    text: transcript.text.clone(),
                    source_language: transcript.language_code.clone(),
                    translated: false,
                });
            }
        };

        let translated = with_timeout(
            "translation",
            self.timeout,
            translator.translate(&transcript.text, &transcript.language_code, target_language),
        )
        .await;

        match translated {
            Ok(text) => {
                info!(
                    "Translated #{} {} -> {}: {}",
                    transcript.sequence, transcript.language_code, target_language, text
                );
                Some(RoutedTranscript {
                    sequence: transcript.sequence,
                    text,
                    source_language: transcript.language_code.clone(),
                    translated: true,
                })
            }
            Err(e) => {
                warn!(
                    "Dropping transcript #{}: translation failed: {:#}",
                    transcript.sequence, e
                );
                None
            }
        }
    }

    /// Spawn the per-session routing task.
    ///
    /// Transcripts sent in are translated concurrently; routed results come
    /// out in the order they went in, so a fast later translation waits for
    /// a slower earlier one. Dropped transcripts leave no gap marker.
    pub fn spawn(
        self: Arc<Self>,
        target_language: String,
    ) -> (
        mpsc::UnboundedSender<Transcript>,
        mpsc::UnboundedReceiver<RoutedTranscript>,
        JoinHandle<()>,
    ) {
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (output_tx, output_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(self.run(target_language, input_rx, output_tx));
        (input_tx, output_rx, task)
    }

    async fn run(
        self: Arc<Self>,
        target_language: String,
        mut input: mpsc::UnboundedReceiver<Transcript>,
        output: mpsc::UnboundedSender<RoutedTranscript>,
    ) {
        let mut in_flight = FuturesOrdered::new();
        let mut input_open = true;

        loop {
            tokio::select! {
                next = input.recv(), if input_open => match next {
                    Some(transcript) => {
                        let router = Arc::clone(&self);
                        let target = target_language.clone();
                        in_flight.push_back(async move { router.route(&transcript, &target).await });
                    }
                    None => input_open = false,
                },
                Some(routed) = in_flight.next(), if !in_flight.is_empty() => {
                    if let Some(routed) = routed {
                        if output.send(routed).is_err() {
                            break;
                        }
                    }
                }
                else => break,
            }
        }

        debug!("Translation router stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{bail, Result};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Uppercases text; delays and failures keyed on the input text
    #[derive(Default)]
    struct FakeTranslator {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Translator for FakeTranslator {
        async fn translate(&self, text: &str, _source: &str, target: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if text.starts_with("slow") {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            if text.starts_with("stuck") {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            if text.starts_with("fail") {
                bail!("translation backend unavailable");
            }
            Ok(format!("[{}] {}", target, text.to_uppercase()))
        }
    }

    fn final_transcript(sequence: u64, text: &str, language: &str) -> Transcript {
        Transcript {
            text: text.to_string(),
            is_final: true,
            language_code: language.to_string(),
            sequence,
        }
    }

    fn router(translator: &Arc<FakeTranslator>) -> TranslationRouter {
        TranslationRouter::new(translator.clone(), Duration::from_millis(500))
    }

    #[tokio::test]
    async fn test_same_language_passes_through_without_call() {
        let translator = Arc::new(FakeTranslator::default());
        let router = router(&translator);

        for (text, lang) in [("I need help", "en-US"), ("Fire on Main St.", "EN-us")] {
            let routed = router
                .route(&final_transcript(0, text, lang), "en-us")
                .await
                .unwrap();
            assert_eq!(routed.text, text);
            assert!(!routed.translated);
        }
        assert_eq!(translator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_other_language_is_translated() {
        let translator = Arc::new(FakeTranslator::default());
        let routed = router(&translator)
            .route(&final_transcript(3, "necesito ayuda", "es-es"), "en-US")
            .await
            .unwrap();

        assert_eq!(routed.text, "[en-US] NECESITO AYUDA");
        assert_eq!(routed.source_language, "es-es");
        assert_eq!(routed.sequence, 3);
        assert!(routed.translated);
    }

    #[tokio::test]
    async fn test_translation_failure_drops_transcript() {
        let translator = Arc::new(FakeTranslator::default());
        let routed = router(&translator)
            .route(&final_transcript(0, "fail please", "hi-in"), "en-US")
            .await;
        assert!(routed.is_none());
    }

    #[tokio::test]
    async fn test_stuck_translation_times_out() {
        let translator = Arc::new(FakeTranslator::default());
        let router = TranslationRouter::new(translator, Duration::from_millis(20));
        let routed = router
            .route(&final_transcript(0, "stuck", "fr-FR"), "en-US")
            .await;
        assert!(routed.is_none());
    }

    #[tokio::test]
    async fn test_partials_are_never_routed() {
        let translator = Arc::new(FakeTranslator::default());
        let mut partial = final_transcript(0, "necesito", "es-es");
        partial.is_final = false;

        assert!(router(&translator).route(&partial, "en-US").await.is_none());
        assert_eq!(translator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_passthrough_router_forwards_everything() {
        let routed = TranslationRouter::passthrough()
            .route(&final_transcript(1, "bonjour", "fr-FR"), "en-US")
            .await
            .unwrap();
        assert_eq!(routed.text, "bonjour");
        assert!(!routed.translated);
    }

    #[tokio::test]
    async fn test_spawned_router_preserves_sequence_order() {
        let translator = Arc::new(FakeTranslator::default());
        let (input, mut output, _task) = Arc::new(router(&translator)).spawn("en-US".to_string());

        input.send(final_transcript(0, "slow first", "es-ES")).unwrap();
        input.send(final_transcript(1, "fast second", "es-ES")).unwrap();
        input.send(final_transcript(2, "already english", "en-US")).unwrap();
        drop(input);

        let mut sequences = Vec::new();
        while let Some(routed) = output.recv().await {
            sequences.push(routed.sequence);
        }
        assert_eq!(sequences, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_spawned_router_skips_failed_and_partial() {
        let translator = Arc::new(FakeTranslator::default());
        let (input, mut output, _task) = Arc::new(router(&translator)).spawn("en-US".to_string());

        let mut partial = final_transcript(0, "interim", "es-ES");
        partial.is_final = false;
        input.send(partial).unwrap();
        input.send(final_transcript(1, "fail this", "es-ES")).unwrap();
        input.send(final_transcript(2, "slow but fine", "es-ES")).unwrap();
        drop(input);

        let routed: Vec<_> = {
            let mut all = Vec::new();
            while let Some(r) = output.recv().await {
                all.push(r);
            }
            all
        };
        assert_eq!(routed.len(), 1);
        assert_eq!(routed[0].sequence, 2);
        assert_eq!(routed[0].text, "[en-US] SLOW BUT FINE");
    }
}
