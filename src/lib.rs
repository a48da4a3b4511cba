pub mod audio;
pub mod cloud;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod http;
pub mod media;
pub mod playback;
pub mod recognition;
pub mod session;
pub mod translation;

pub use audio::{linear16_to_telephony, mulaw_decode, mulaw_encode, telephony_to_linear16, PcmAudio};
pub use config::Config;
pub use dispatcher::{DispatcherChannel, DispatcherReply, ProcessDispatcher};
pub use error::RelayError;
pub use http::{create_router, AppState};
pub use media::{MediaChannel, MediaEvent};
pub use playback::{CloudSynthesizer, PlaybackInjector, SpeechSynthesizer};
pub use recognition::{SpeechRecognizer, Transcript, WebSocketRecognizer};
pub use session::{CallHandle, CallSession, LifecycleState, Pipeline, SessionRegistry, SessionStats};
pub use translation::{CloudTranslator, TranslationRouter, Translator};
