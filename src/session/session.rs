use anyhow::Result;
use std::collections::VecDeque;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, error, info, warn, Instrument, Span};

use super::{CallHandle, LifecycleState, Pipeline};
use crate::dispatcher::DispatcherStatus;
use crate::media::{MediaChannel, MediaEvent};
use crate::recognition::{RecognitionAdapter, RecognitionEvent, Transcript};
use crate::translation::RoutedTranscript;

/// Owns one live call: its media channel, its recognition stream and the
/// routing of its transcripts.
///
/// Everything the session reacts to arrives through [`CallSession::run`]:
/// transport events from the media queue and results from the current
/// recognition stream. Both are handled one at a time on the session's own
/// task, so audio is forwarded in arrival order and state only changes here.
pub struct CallSession {
    pipeline: Arc<Pipeline>,
    media: Arc<MediaChannel>,
    state_tx: watch::Sender<LifecycleState>,
    call: Option<CallHandle>,

    /// Audio that arrived before "start"
    pending_audio: VecDeque<Vec<u8>>,

    recognition: Option<RecognitionAdapter>,
    recognition_events: Option<mpsc::UnboundedReceiver<RecognitionEvent>>,
    recognition_restarts: u32,

    /// Transcript numbering, shared by every recognition stream of this call
    sequence: Arc<AtomicU64>,

    router_input: Option<mpsc::UnboundedSender<Transcript>>,

    /// Set on "stop": when to give up waiting for the transport to hang up
    close_deadline: Option<Instant>,
}

impl CallSession {
    pub fn new(pipeline: Arc<Pipeline>, media: Arc<MediaChannel>) -> Self {
        let (state_tx, _) = watch::channel(LifecycleState::Connecting);
        Self {
            pipeline,
            media,
            state_tx,
            call: None,
            pending_audio: VecDeque::new(),
            recognition: None,
            recognition_events: None,
            recognition_restarts: 0,
            sequence: Arc::new(AtomicU64::new(0)),
            router_input: None,
            close_deadline: None,
        }
    }

    pub fn state(&self) -> LifecycleState {
        *self.state_tx.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<LifecycleState> {
        self.state_tx.subscribe()
    }

    /// Available once "start" has been processed
    pub fn call(&self) -> Option<&CallHandle> {
        self.call.as_ref()
    }

    /// Drive the session until it is closed. Returns the final state.
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<MediaEvent>) -> LifecycleState {
        while !self.state().is_terminal() {
            let deadline = self.close_deadline;

            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle_media_event(event).await,
                    None => {
                        debug!("Media transport closed");
                        self.close().await;
                    }
                },
                event = next_recognition_event(&mut self.recognition_events) => {
                    self.handle_recognition_event(event).await;
                }
                _ = wait_until(deadline) => {
                    warn!("Transport still open after stop; closing");
                    self.close().await;
                }
            }
        }

        self.state()
    }

    pub async fn handle_media_event(&mut self, event: MediaEvent) {
        match event {
            MediaEvent::Connected => info!("Media transport connected"),
            MediaEvent::Start {
                stream_sid,
                call_sid,
            } => self.start(stream_sid, call_sid).await,
            MediaEvent::Media(chunk) => self.accept_audio(chunk),
            MediaEvent::Stop => self.begin_close().await,
            MediaEvent::TransportError(reason) => {
                error!("Media transport error: {}", reason);
                self.close().await;
            }
        }
    }

    pub async fn handle_recognition_event(&mut self, event: RecognitionEvent) {
        match event {
            RecognitionEvent::Transcript(transcript) if !transcript.is_final => {
                debug!(
                    "Interim transcript #{}: {}",
                    transcript.sequence, transcript.text
                );
            }
            RecognitionEvent::Transcript(transcript) => self.handle_final(transcript),
            RecognitionEvent::Failed(reason) => {
                if self.state() == LifecycleState::Streaming {
                    self.recover_recognition(reason).await;
                } else {
                    debug!("Recognition ended while {:?}: {}", self.state(), reason);
                }
            }
        }
    }

    async fn start(&mut self, stream_sid: String, call_sid: String) {
        if self.state() != LifecycleState::Connecting {
            warn!("Ignoring repeated start for call {}", call_sid);
            return;
        }

        Span::current().record("call_sid", call_sid.as_str());
        info!("Stream started. CallSid: {}, StreamSid: {}", call_sid, stream_sid);

        let call = CallHandle::new(
            call_sid,
            stream_sid,
            Arc::clone(&self.media),
            self.state_tx.subscribe(),
        );
        self.pipeline.registry.register(call.clone()).await;
        self.call = Some(call.clone());
        self.state_tx.send_replace(LifecycleState::Streaming);

        let (input, output, _router) = Arc::clone(&self.pipeline.router)
            .spawn(self.pipeline.config.target_language.clone());
        self.router_input = Some(input);
        tokio::spawn(forward_routed(Arc::clone(&self.pipeline), call, output).in_current_span());

        if let Err(e) = self.open_recognition().await {
            self.recover_recognition(format!("{:#}", e)).await;
        }

        if self.state() == LifecycleState::Streaming && !self.pending_audio.is_empty() {
            info!("Flushing {} media frames received before start", self.pending_audio.len());
            for chunk in std::mem::take(&mut self.pending_audio) {
                self.accept_audio(chunk);
            }
        }
    }

    fn accept_audio(&mut self, chunk: Vec<u8>) {
        match self.state() {
            LifecycleState::Connecting => {
                let limit = self.pipeline.config.pre_start_buffer_frames;
                if limit == 0 {
                    warn!("Media received before start; dropping");
                    return;
                }
                if self.pending_audio.is_empty() {
                    warn!("Media received before start; buffering");
                }
                if self.pending_audio.len() >= limit {
                    warn!("Pre-start buffer full ({} frames); dropping oldest", limit);
                    self.pending_audio.pop_front();
                }
                self.pending_audio.push_back(chunk);
            }
            LifecycleState::Streaming => {
                if let Some(call) = &self.call {
                    call.record_media_frame();
                }
                match &self.recognition {
                    Some(recognition) => {
                        recognition.submit_audio(chunk);
                    }
                    None => warn!("Speech stream not available, skipping media message"),
                }
            }
            LifecycleState::Closing | LifecycleState::Closed => match &self.recognition {
                Some(recognition) => {
                    recognition.submit_audio(chunk);
                }
                None => debug!("Media after close dropped"),
            },
        }
    }

    fn handle_final(&mut self, transcript: Transcript) {
        let Some(call) = self.call.clone() else {
            return;
        };

        let text = transcript.text.trim();
        if text.is_empty() {
            warn!("Empty transcription received, skipping processing");
            return;
        }

        info!(
            "Final transcript #{} [{}]: {}",
            transcript.sequence, transcript.language_code, text
        );
        call.record_final_transcript();

        let language = call.detect_language(&transcript.language_code).to_string();
        self.bootstrap_dispatcher(&call, language);

        if let Some(input) = &self.router_input {
            let _ = input.send(Transcript {
                text: text.to_string(),
                ..transcript
            });
        }
    }

    /// Launch the dispatcher for this call, at most once
    fn bootstrap_dispatcher(&self, call: &CallHandle, language: String) {
        let Some(dispatcher) = self.pipeline.dispatcher.clone() else {
            return;
        };
        if !call.bootstrap_guard().try_acquire() {
            return;
        }

        call.set_dispatcher_status(DispatcherStatus::Launching);
        let call = call.clone();

        tokio::spawn(
            async move {
                info!("Starting dispatcher. Caller's language: {}", language);
                match dispatcher.bootstrap(call.call_sid(), &language).await {
                    Ok(()) => {
                        info!("Dispatcher launched successfully");
                        call.set_dispatcher_status(DispatcherStatus::Ready);
                    }
                    Err(e) => {
                        error!("Failed to start dispatcher: {:#}", e);
                        call.set_dispatcher_status(DispatcherStatus::Failed);
                    }
                }
            }
            .in_current_span(),
        );
    }

    async fn open_recognition(&mut self) -> Result<()> {
        let (adapter, events) = RecognitionAdapter::start(
            self.pipeline.recognizer.as_ref(),
            &self.pipeline.recognition_config(),
            Arc::clone(&self.sequence),
        )
        .await?;

        self.recognition = Some(adapter);
        self.recognition_events = Some(events);
        Ok(())
    }

    /// Replace a failed recognition stream, or end the call when out of restarts
    async fn recover_recognition(&mut self, mut reason: String) {
        self.recognition = None;
        self.recognition_events = None;
        let max = self.pipeline.config.max_recognition_restarts;

        loop {
            if self.recognition_restarts >= max {
                error!("Recognition failed ({}); no restarts left, ending call", reason);
                self.close().await;
                return;
            }

            self.recognition_restarts += 1;
            warn!(
                "Recognition failed ({}); restarting ({}/{})",
                reason, self.recognition_restarts, max
            );

            match self.open_recognition().await {
                Ok(()) => return,
                Err(e) => reason = format!("{:#}", e),
            }
        }
    }

    async fn begin_close(&mut self) {
        match self.state() {
            LifecycleState::Connecting => {
                self.close().await;
            }
            LifecycleState::Streaming => {
                info!("Stream stopped");
                self.state_tx.send_replace(LifecycleState::Closing);
                if let Some(recognition) = &mut self.recognition {
                    recognition.end();
                }
                self.close_deadline = Some(Instant::now() + self.pipeline.config.close_grace());
            }
            LifecycleState::Closing | LifecycleState::Closed => debug!("Repeated stop ignored"),
        }
    }

    /// Release recognition and media, then mark the session closed.
    ///
    /// Returns `false` when the session was already closed.
    pub async fn close(&mut self) -> bool {
        if self.state().is_terminal() {
            return false;
        }
        self.state_tx.send_replace(LifecycleState::Closing);

        if let Some(mut recognition) = self.recognition.take() {
            recognition.end();
        }
        self.recognition_events = None;
        self.pending_audio.clear();
        self.close_deadline = None;

        // In-flight translations still drain to the forwarder
        self.router_input = None;

        if let Some(call) = &self.call {
            self.pipeline.registry.unregister(call).await;
        }
        self.media.release();

        self.state_tx.send_replace(LifecycleState::Closed);
        info!("Call session closed");
        true
    }
}

/// Deliver routed transcripts downstream in order, then release the dispatcher
async fn forward_routed(
    pipeline: Arc<Pipeline>,
    call: CallHandle,
    mut routed: mpsc::UnboundedReceiver<RoutedTranscript>,
) {
    while let Some(item) = routed.recv().await {
        if let Some(dispatcher) = &pipeline.dispatcher {
            if call.dispatcher_settled().await == DispatcherStatus::Ready {
                if let Err(e) = dispatcher.deliver(call.call_sid(), &item.text).await {
                    warn!("Failed to deliver transcript #{}: {:#}", item.sequence, e);
                }
            }
        }

        if let Some(classifier) = &pipeline.classifier {
            match classifier.classify(&item.text).await {
                Ok(result) => info!(
                    "Classification for #{}: response={:?} severity={:?}",
                    item.sequence, result.response, result.severity
                ),
                Err(e) => warn!("Classifier not available, continuing without it: {:#}", e),
            }
        }
    }

    if let Some(dispatcher) = &pipeline.dispatcher {
        if call.bootstrap_guard().is_bootstrapped() {
            call.dispatcher_settled().await;
            dispatcher.release(call.call_sid()).await;
        }
    }
    debug!("Transcript forwarder stopped");
}

async fn next_recognition_event(
    events: &mut Option<mpsc::UnboundedReceiver<RecognitionEvent>>,
) -> RecognitionEvent {
    if let Some(rx) = events.as_mut() {
        if let Some(event) = rx.recv().await {
            return event;
        }
        *events = None;
    }
    std::future::pending().await
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
