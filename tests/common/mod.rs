//! Fake engines shared by the integration tests
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use call_relay::audio::PcmAudio;
use call_relay::recognition::{EngineResult, EngineStream, RecognitionConfig};
use call_relay::{DispatcherChannel, SpeechRecognizer, SpeechSynthesizer, Translator};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;

/// One recognition stream opened by [`FakeRecognizer`]
pub struct FakeStream {
    pub audio: mpsc::UnboundedReceiver<Vec<u8>>,
    pub results: mpsc::Sender<Result<EngineResult>>,
}

impl FakeStream {
    pub async fn push_final(&self, text: &str, language: &str) {
        self.results
            .send(Ok(EngineResult {
                text: text.to_string(),
                is_final: true,
                language_code: Some(language.to_string()),
            }))
            .await
            .unwrap();
    }

    pub async fn push_interim(&self, text: &str) {
        self.results
            .send(Ok(EngineResult {
                text: text.to_string(),
                is_final: false,
                language_code: None,
            }))
            .await
            .unwrap();
    }

    pub async fn push_error(&self, message: &str) {
        self.results.send(Err(anyhow!(message.to_string()))).await.unwrap();
    }

    /// Next audio chunk, or `None` once the stream has been ended
    pub async fn next_audio(&mut self) -> Option<Vec<u8>> {
        tokio::time::timeout(Duration::from_secs(2), self.audio.recv())
            .await
            .expect("timed out waiting for recognition audio")
    }
}

/// Recognition engine whose streams the test drives by hand
#[derive(Default)]
pub struct FakeRecognizer {
    streams: Mutex<Vec<Option<FakeStream>>>,
    opens: AtomicUsize,
    failing_opens: AtomicUsize,
}

impl FakeRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `count` opens fail
    pub fn fail_next_opens(&self, count: usize) {
        self.failing_opens.store(count, Ordering::SeqCst);
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn streams_opened(&self) -> usize {
        self.streams.lock().unwrap().len()
    }

    pub async fn take_stream(&self, index: usize) -> FakeStream {
        eventually(|| self.streams_opened() > index).await;
        self.streams.lock().unwrap()[index]
            .take()
            .expect("stream already taken")
    }
}

#[async_trait::async_trait]
impl SpeechRecognizer for FakeRecognizer {
    async fn open(&self, _config: &RecognitionConfig) -> Result<EngineStream> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let failing = self.failing_opens.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_opens.store(failing - 1, Ordering::SeqCst);
            return Err(anyhow!("recognition engine unavailable"));
        }

        let (audio_tx, audio_rx) = mpsc::unbounded_channel();
        let (results_tx, results_rx) = mpsc::channel(32);
        self.streams.lock().unwrap().push(Some(FakeStream {
            audio: audio_rx,
            results: results_tx,
        }));
        Ok(EngineStream {
            audio: audio_tx,
            results: results_rx,
        })
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Prefixes the target language; "slow" takes a while, "fail" errors
#[derive(Default)]
pub struct FakeTranslator;

#[async_trait::async_trait]
impl Translator for FakeTranslator {
    async fn translate(&self, text: &str, _source: &str, target: &str) -> Result<String> {
        if text.contains("slow") {
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        if text.contains("fail") {
            return Err(anyhow!("translation quota exceeded"));
        }
        Ok(format!("[{}] {}", target, text))
    }
}

#[derive(Default)]
pub struct FakeDispatcher {
    pub bootstraps: Mutex<Vec<(String, String)>>,
    pub deliveries: Mutex<Vec<(String, String)>>,
    pub releases: Mutex<Vec<String>>,
}

impl FakeDispatcher {
    pub fn delivered_texts(&self) -> Vec<String> {
        self.deliveries
            .lock()
            .unwrap()
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl DispatcherChannel for FakeDispatcher {
    async fn bootstrap(&self, call_id: &str, language: &str) -> Result<()> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.bootstraps
            .lock()
            .unwrap()
            .push((call_id.to_string(), language.to_string()));
        Ok(())
    }

    async fn deliver(&self, call_id: &str, text: &str) -> Result<()> {
        self.deliveries
            .lock()
            .unwrap()
            .push((call_id.to_string(), text.to_string()));
        Ok(())
    }

    async fn release(&self, call_id: &str) {
        self.releases.lock().unwrap().push(call_id.to_string());
    }
}

/// Returns a fixed tone, or fails when `fail` is set
pub struct FakeSynthesizer {
    pub samples: usize,
    pub sample_rate: u32,
    pub fail: bool,
    pub calls: Mutex<Vec<(String, String)>>,
}

impl FakeSynthesizer {
    pub fn new(samples: usize, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(0, 16000)
        }
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    async fn synthesize(&self, text: &str, language: &str) -> Result<PcmAudio> {
        self.calls
            .lock()
            .unwrap()
            .push((text.to_string(), language.to_string()));
        if self.fail {
            return Err(anyhow!("synthesis backend rejected request"));
        }
        let samples = (0..self.samples)
            .map(|i| ((i as f64 * 0.3).sin() * 8000.0) as i16)
            .collect();
        Ok(PcmAudio {
            samples,
            sample_rate: self.sample_rate,
        })
    }
}

/// Poll `check` until it holds, failing the test after two seconds
pub async fn eventually(check: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
