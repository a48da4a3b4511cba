use crate::playback::PlaybackInjector;
use crate::session::{Pipeline, SessionRegistry};
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,

    /// Live calls (call_sid → handle), shared with every session
    pub registry: Arc<SessionRegistry>,

    pub injector: Arc<PlaybackInjector>,
}

impl AppState {
    pub fn new(pipeline: Pipeline, injector: PlaybackInjector) -> Self {
        let registry = Arc::clone(&pipeline.registry);
        Self {
            pipeline: Arc::new(pipeline),
            registry,
            injector: Arc::new(injector),
        }
    }
}
