use super::state::AppState;
use super::{handlers, media};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Telephony media stream
        .route("/media", get(media::media_stream))
        // Dispatcher replies
        .route("/dispatcher-response", post(handlers::dispatcher_response))
        // Call queries
        .route("/calls", get(handlers::list_calls))
        .route("/calls/:call_sid/status", get(handlers::get_call_status))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
