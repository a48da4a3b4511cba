use super::state::AppState;
use crate::dispatcher::DispatcherReply;
use crate::error::RelayError;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Serialize;
use tracing::{error, info, warn};

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ReplyResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct CallListResponse {
    pub calls: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> axum::response::Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

/// Replies for calls that are gone or going are acknowledged, not errors
fn reply_dropped(message: &str) -> axum::response::Response {
    (
        StatusCode::OK,
        Json(ReplyResponse {
            success: true,
            message: message.to_string(),
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /dispatcher-response
/// Speak a dispatcher's reply into the call it belongs to
pub async fn dispatcher_response(
    State(state): State<AppState>,
    payload: Result<Json<DispatcherReply>, JsonRejection>,
) -> impl IntoResponse {
    let reply = match payload
        .map_err(|e| RelayError::InvalidPayload(e.body_text()))
        .and_then(|Json(reply)| reply.validate())
    {
        Ok(reply) => reply,
        Err(e) => {
            warn!("Rejected dispatcher reply: {}", e);
            return error_response(StatusCode::BAD_REQUEST, e.to_string());
        }
    };

    info!("Received response from dispatcher: {}", reply.text);

    let Some(call) = state.registry.resolve(reply.call_sid.as_deref()).await else {
        warn!(
            "No live call for dispatcher reply (callSid: {}); dropping",
            reply.call_sid.as_deref().unwrap_or("<none>")
        );
        return reply_dropped("No live call; reply dropped");
    };

    if !call.state().accepts_audio() {
        warn!(
            "Call {} is {:?}; dropping dispatcher reply",
            call.call_sid(),
            call.state()
        );
        return reply_dropped("Call is closing; reply dropped");
    }

    let language = if !reply.language.trim().is_empty() {
        reply.language.clone()
    } else {
        call.detected_language()
            .unwrap_or(&state.pipeline.config.primary_language)
            .to_string()
    };

    match state.injector.play(&call, &reply.text, &language).await {
        Ok(report) => (
            StatusCode::OK,
            Json(ReplyResponse {
                success: true,
                message: format!(
                    "Played {} chunks into call {}",
                    report.chunks_sent,
                    call.call_sid()
                ),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Error processing dispatcher response: {:#}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to play reply: {}", e),
            )
        }
    }
}

/// GET /calls
/// List live call ids
pub async fn list_calls(State(state): State<AppState>) -> impl IntoResponse {
    Json(CallListResponse {
        calls: state.registry.call_sids().await,
    })
}

/// GET /calls/:call_sid/status
/// Get status of a call session
pub async fn get_call_status(
    State(state): State<AppState>,
    Path(call_sid): Path<String>,
) -> impl IntoResponse {
    match state.registry.get(&call_sid).await {
        Some(call) => (StatusCode::OK, Json(call.stats())).into_response(),
        None => error_response(StatusCode::NOT_FOUND, format!("Call {} not found", call_sid)),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
