//! HTTP surface driven through the router without a socket.

#[path = "../common/mod.rs"]
mod common;

use std::{sync::Arc, time::Duration};

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use common::Harness;
use serde_json::{json, Value};
use serene_focus::{
    api::{create_router, AppState},
    controller::actor,
};
use tower::ServiceExt;

fn router(h: &Harness) -> Router {
    let (handle, _task) = actor::spawn(h.controller.clone(), 16);
    let state = AppState::new(
        handle,
        h.records.clone(),
        h.tabs.clone(),
        h.dyn_clock(),
        Duration::from_secs(2),
        20554,
        "127.0.0.1".to_string(),
    );
    create_router(Arc::new(state))
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(body) => {
            request = request.header("content-type", "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };
    let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn health_reports_version() {
    let h = Harness::new();
    let app = router(&h);
    let (status, body) = call(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn start_then_read_state() {
    let h = Harness::new();
    h.controller.initialize().await.unwrap();
    let app = router(&h);

    let (status, body) = call(&app, Method::POST, "/start", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["timer"]["isRunning"], true);
    assert_eq!(body["timer"]["phase"], "WORK_RUNNING");

    h.clock.advance_secs(90);
    let (status, body) = call(&app, Method::GET, "/state", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["timeLeft"], 1410);
    assert_eq!(body["clock"], "23:30");
    assert_eq!(body["badge"], "24");
}

#[tokio::test]
async fn state_is_served_before_first_intent() {
    let h = Harness::new();
    let app = router(&h);
    let (status, body) = call(&app, Method::GET, "/state", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mode"], "work");
    assert_eq!(body["timeLeft"], 1500);
    assert_eq!(body["phase"], "WORK_IDLE");
}

#[tokio::test]
async fn settings_validation_maps_to_status() {
    let h = Harness::new();
    h.controller.initialize().await.unwrap();
    let app = router(&h);

    let (status, body) = call(
        &app,
        Method::PUT,
        "/settings",
        Some(json!({"workMinutes": 0, "shortBreakMinutes": 5, "longBreakMinutes": 15})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["status"], "rejected");
    assert_eq!(body["settings"]["workDuration"], 1500);

    let (status, body) = call(
        &app,
        Method::PUT,
        "/settings",
        Some(json!({"workMinutes": 45, "shortBreakMinutes": 10, "longBreakMinutes": 20})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["settings"]["workDuration"], 2700);

    let (_, body) = call(&app, Method::GET, "/settings", None).await;
    assert_eq!(body["settings"]["longBreakDuration"], 1200);
}

#[tokio::test]
async fn oversized_settings_are_rejected() {
    let h = Harness::new();
    h.controller.initialize().await.unwrap();
    let app = router(&h);

    let (status, body) = call(
        &app,
        Method::PUT,
        "/settings",
        Some(json!({
            "workMinutes": 200_000_000_000_000u64,
            "shortBreakMinutes": 5,
            "longBreakMinutes": 15
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["settings"]["workDuration"], 1500);

    // The controller is still alive and counting with the old durations.
    let (status, body) = call(&app, Method::POST, "/start", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["timer"]["timeLeft"], 1500);
}

#[tokio::test]
async fn largest_tab_id_does_not_break_the_mirror() {
    let h = Harness::new();
    h.controller.initialize().await.unwrap();
    let app = router(&h);

    let (status, _) = call(
        &app,
        Method::POST,
        "/tabs",
        Some(json!({"tabId": u64::MAX, "windowId": 1, "url": "https://far.example"})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, _) = call(
        &app,
        Method::POST,
        "/tabs",
        Some(json!({"tabId": 5, "windowId": 1, "url": "https://example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (_, tabs) = call(&app, Method::GET, "/tabs", None).await;
    assert_eq!(tabs.as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn tab_reports_feed_enforcement() {
    let h = Harness::new();
    h.controller.initialize().await.unwrap();
    let app = router(&h);

    let (status, _) = call(
        &app,
        Method::POST,
        "/tabs",
        Some(json!({"tabId": 3, "windowId": 1, "url": "https://example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (_, tabs) = call(&app, Method::GET, "/tabs", None).await;
    assert_eq!(tabs.as_array().map(Vec::len), Some(1));
    assert_eq!(tabs[0]["url"], "https://example.com");

    let (status, _) = call(&app, Method::POST, "/tabs/42/activated", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&app, Method::DELETE, "/tabs/3", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app, Method::DELETE, "/tabs/3", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn break_ended_is_idempotent_over_http() {
    let h = Harness::new();
    h.open_tab(1, "https://example.com");
    h.controller.initialize().await.unwrap();
    h.run_work_to_deadline().await;
    let app = router(&h);

    let (status, body) = call(&app, Method::POST, "/check", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["timer"]["mode"], "break");

    let resume = Some(json!({"manualResume": true}));
    let (status, first) = call(&app, Method::POST, "/break-ended", resume.clone()).await;
    assert_eq!(status, StatusCode::OK);
    let (_, second) = call(&app, Method::POST, "/break-ended", resume).await;

    assert_eq!(first["timer"], second["timer"]);
    assert_eq!(second["timer"]["sessionsCompleted"], 1);
    assert_eq!(h.tab_url(1).as_deref(), Some("https://example.com"));
}

#[tokio::test]
async fn status_tracks_last_action() {
    let h = Harness::new();
    h.controller.initialize().await.unwrap();
    let app = router(&h);

    call(&app, Method::POST, "/pause", None).await;
    let (status, body) = call(&app, Method::GET, "/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["last_action"], "pause");
    assert_eq!(body["port"], 20554);
}
