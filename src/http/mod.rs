//! HTTP API server for the telephony provider and dispatchers
//!
//! This module provides the relay's network surface:
//! - GET /media - WebSocket media stream, one call per connection
//! - POST /dispatcher-response - Dispatcher reply to speak into a call
//! - GET /calls - Live call ids
//! - GET /calls/:call_sid/status - Query session status
//! - GET /health - Health check

mod handlers;
mod media;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
