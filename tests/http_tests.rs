mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use call_relay::config::PipelineConfig;
use call_relay::media::{MediaChannel, OutboundMedia};
use call_relay::{create_router, AppState, CallHandle, LifecycleState, Pipeline, PlaybackInjector};
use common::{FakeRecognizer, FakeSynthesizer};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tower::ServiceExt;

struct TestApp {
    state: AppState,
    synthesizer: Arc<FakeSynthesizer>,
}

fn app_with(synthesizer: FakeSynthesizer) -> TestApp {
    let synthesizer = Arc::new(synthesizer);
    let pipeline = Pipeline::new(PipelineConfig::default(), Arc::new(FakeRecognizer::new()));
    let injector = PlaybackInjector::new(synthesizer.clone(), Duration::from_secs(1), 160);
    TestApp {
        state: AppState::new(pipeline, injector),
        synthesizer,
    }
}

fn app() -> TestApp {
    app_with(FakeSynthesizer::new(400, 8000))
}

/// Register a live call; the returned sender keeps it streaming
async fn register_call(
    app: &TestApp,
    call_sid: &str,
) -> (watch::Sender<LifecycleState>, mpsc::Receiver<OutboundMedia>) {
    let (media, outbound) = MediaChannel::new(64);
    let (state, state_rx) = watch::channel(LifecycleState::Streaming);
    let call = CallHandle::new(call_sid, format!("MZ-{}", call_sid), Arc::new(media), state_rx);
    app.state.registry.register(call).await;
    (state, outbound)
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = create_router(app.state.clone())
        .oneshot(request)
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

async fn post_reply(app: &TestApp, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/dispatcher-response")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

async fn get(app: &TestApp, uri: &str) -> (StatusCode, Vec<u8>) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

#[tokio::test]
async fn test_health_check() {
    let app = app();
    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");
}

#[tokio::test]
async fn test_empty_text_is_rejected_without_playback() {
    let app = app();
    let (_state, mut outbound) = register_call(&app, "abc").await;

    let (status, body) = post_reply(&app, r#"{"text":"","language":"en","callSid":"abc"}"#).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("text"));
    assert!(app.synthesizer.calls().is_empty());
    assert!(outbound.try_recv().is_err());
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let app = app();
    let (status, body) = post_reply(&app, "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_unknown_call_is_acknowledged_without_playback() {
    let app = app();
    let (_state, mut outbound) = register_call(&app, "CA1").await;

    let (status, body) =
        post_reply(&app, r#"{"text":"Help is coming","language":"en-US","callSid":"CA404"}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert!(app.synthesizer.calls().is_empty());
    assert!(outbound.try_recv().is_err());
}

#[tokio::test]
async fn test_reply_is_played_into_the_call() {
    let app = app();
    let (_state, mut outbound) = register_call(&app, "CA1").await;

    let (status, body) =
        post_reply(&app, r#"{"text":"Ayuda en camino","language":"es-ES","callSid":"CA1"}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(
        app.synthesizer.calls(),
        vec![("Ayuda en camino".to_string(), "es-ES".to_string())]
    );

    let mut frames = 0;
    while let Ok(frame) = outbound.try_recv() {
        assert_eq!(frame.stream_sid, "MZ-CA1");
        frames += 1;
    }
    assert_eq!(frames, 3);
}

#[tokio::test]
async fn test_missing_language_falls_back_to_primary() {
    let app = app();
    let (_state, _outbound) = register_call(&app, "CA1").await;

    // No callSid either: the only live call is the target
    let (status, _) = post_reply(&app, r#"{"text":"One moment please"}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        app.synthesizer.calls(),
        vec![("One moment please".to_string(), "en-US".to_string())]
    );
}

#[tokio::test]
async fn test_synthesis_failure_is_server_error() {
    let app = app_with(FakeSynthesizer::failing());
    let (_state, mut outbound) = register_call(&app, "CA1").await;

    let (status, body) = post_reply(&app, r#"{"text":"Hello","callSid":"CA1"}"#).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());
    assert!(outbound.try_recv().is_err());
}

#[tokio::test]
async fn test_reply_to_closing_call_is_dropped() {
    let app = app();
    let (state, mut outbound) = register_call(&app, "CA1").await;
    state.send_replace(LifecycleState::Closing);

    let (status, body) = post_reply(&app, r#"{"text":"Hello","callSid":"CA1"}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert!(app.synthesizer.calls().is_empty());
    assert!(outbound.try_recv().is_err());
}

#[tokio::test]
async fn test_call_listing_and_status() {
    let app = app();
    let (_a, _ra) = register_call(&app, "CA2").await;
    let (_b, _rb) = register_call(&app, "CA1").await;

    let (status, body) = get(&app, "/calls").await;
    assert_eq!(status, StatusCode::OK);
    let listing: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(listing["calls"], json!(["CA1", "CA2"]));

    let (status, body) = get(&app, "/calls/CA1/status").await;
    assert_eq!(status, StatusCode::OK);
    let stats: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(stats["call_sid"], json!("CA1"));
    assert_eq!(stats["state"], json!("streaming"));
    assert_eq!(stats["dispatcher"], json!("not_started"));

    let (status, _) = get(&app, "/calls/CA9/status").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
