use std::{sync::Arc, time::Duration};

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde::de::DeserializeOwned;
use tower::ServiceExt;

use focus_timer::{
    api::{
        create_router,
        responses::{HealthResponse, StatusResponse, TimerResponse},
    },
    services::AlarmConfig,
    state::{AppState, DisplayState, TimerStatus},
    timer::{KeyValueStore, ManualClock, MemoryStore, TimerEngine},
};

const T0: i64 = 1_700_000_000_000;

struct Harness {
    app: Router,
    state: Arc<AppState>,
    store: MemoryStore,
    clock: ManualClock,
}

fn harness_with(store: MemoryStore, clock: ManualClock) -> Harness {
    let engine = TimerEngine::new(Box::new(store.clone()), Arc::new(clock.clone()));
    let alarm = AlarmConfig::new(Some("true".to_string()), true);
    let state = Arc::new(AppState::new(20554, "127.0.0.1".to_string(), engine, alarm));
    state.restore().unwrap();
    Harness {
        app: create_router(Arc::clone(&state)),
        state,
        store,
        clock,
    }
}

fn harness() -> Harness {
    harness_with(MemoryStore::new(), ManualClock::new(T0))
}

async fn call<T: DeserializeOwned>(app: &Router, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, Option<T>) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).ok())
}

async fn post(app: &Router, uri: &str) -> TimerResponse {
    let (status, body) = call(app, Method::POST, uri, None).await;
    assert_eq!(status, StatusCode::OK, "POST {}", uri);
    body.unwrap()
}

async fn get_timer(app: &Router) -> DisplayState {
    let (status, body) = call(app, Method::GET, "/timer", None).await;
    assert_eq!(status, StatusCode::OK);
    body.unwrap()
}

#[tokio::test]
async fn fresh_timer_is_idle_at_default_length() {
    let h = harness();
    let timer = get_timer(&h.app).await;

    assert_eq!(timer.status, TimerStatus::Idle);
    assert_eq!(timer.remaining_seconds, 1500);
    assert_eq!(timer.duration_seconds, 1500);
    assert_eq!(timer.progress_percent, 100.0);
    assert_eq!(timer.formatted, "25:00");
}

#[tokio::test]
async fn start_pause_resume_cycle() {
    let h = harness();

    let started = post(&h.app, "/timer/start").await;
    assert!(started.is_running());
    assert_eq!(started.status, "running");

    h.clock.advance(Duration::from_secs(300));
    let timer = get_timer(&h.app).await;
    assert_eq!(timer.remaining_seconds, 1200);
    assert_eq!(timer.progress_percent, 80.0);

    let paused = post(&h.app, "/timer/pause").await;
    assert_eq!(paused.timer.status, TimerStatus::Paused);
    assert_eq!(paused.timer.remaining_seconds, 1200);

    h.clock.advance(Duration::from_secs(600));
    assert_eq!(get_timer(&h.app).await.remaining_seconds, 1200);

    let resumed = post(&h.app, "/timer/toggle").await;
    assert_eq!(resumed.timer.status, TimerStatus::Running);
    assert_eq!(resumed.timer.remaining_seconds, 1200);
}

#[tokio::test]
async fn expiry_is_reported_once() {
    let h = harness();
    post(&h.app, "/timer/start").await;

    h.clock.advance(Duration::from_secs(1500));
    let timer = get_timer(&h.app).await;
    assert_eq!(timer.status, TimerStatus::Expired);
    assert_eq!(timer.remaining_seconds, 0);

    let timer = get_timer(&h.app).await;
    assert_eq!(timer.status, TimerStatus::Idle);

    let reconciled = post(&h.app, "/timer/reconcile").await;
    assert_eq!(reconciled.timer.status, TimerStatus::Idle);
    assert_eq!(h.state.completed_sessions(), 1);
}

#[tokio::test]
async fn duration_is_clamped_and_resets() {
    let h = harness();
    post(&h.app, "/timer/start").await;

    let (status, body) = call::<TimerResponse>(&h.app, Method::PUT, "/timer/duration", Some(r#"{"minutes":10}"#)).await;
    assert_eq!(status, StatusCode::OK);
    let timer = body.unwrap().timer;
    assert_eq!(timer.status, TimerStatus::Idle);
    assert_eq!(timer.remaining_seconds, 600);
    assert_eq!(timer.duration_seconds, 600);

    let (_, body) = call::<TimerResponse>(&h.app, Method::PUT, "/timer/duration", Some(r#"{"minutes":120}"#)).await;
    assert_eq!(body.unwrap().timer.duration_seconds, 3600);

    let (_, body) = call::<TimerResponse>(&h.app, Method::PUT, "/timer/duration", Some(r#"{"minutes":1}"#)).await;
    assert_eq!(body.unwrap().timer.duration_seconds, 300);
}

#[tokio::test]
async fn malformed_duration_body_is_rejected() {
    let h = harness();
    let (status, _) = call::<serde_json::Value>(&h.app, Method::PUT, "/timer/duration", Some(r#"{"minutes":"ten"}"#)).await;
    assert!(status.is_client_error());

    // state untouched
    assert_eq!(get_timer(&h.app).await.duration_seconds, 1500);
}

#[tokio::test]
async fn reset_returns_full_session() {
    let h = harness();
    post(&h.app, "/timer/start").await;
    h.clock.advance(Duration::from_secs(90));

    let reset = post(&h.app, "/timer/reset").await;
    assert_eq!(reset.status, "idle");
    assert_eq!(reset.timer.remaining_seconds, 1500);
    assert_eq!(h.store.get("pomodoro.deadlineEpochMs"), None);
}

#[tokio::test]
async fn restart_picks_up_running_countdown() {
    let store = MemoryStore::new();
    let clock = ManualClock::new(T0);

    let first = harness_with(store.clone(), clock.clone());
    post(&first.app, "/timer/start").await;
    drop(first);

    clock.advance(Duration::from_secs(100));
    let second = harness_with(store, clock);
    let timer = get_timer(&second.app).await;
    assert_eq!(timer.status, TimerStatus::Running);
    assert_eq!(timer.remaining_seconds, 1400);
}

#[tokio::test]
async fn reconcile_sees_another_writer() {
    let h = harness();
    post(&h.app, "/timer/start").await;

    // another client paused the shared countdown
    let mut other = h.store.clone();
    other.delete("pomodoro.deadlineEpochMs").unwrap();
    other.set("pomodoro.remainingSeconds", "700").unwrap();

    let reconciled = post(&h.app, "/timer/reconcile").await;
    assert_eq!(reconciled.timer.status, TimerStatus::Paused);
    assert_eq!(reconciled.timer.remaining_seconds, 700);
}

#[tokio::test]
async fn status_reports_last_action_and_sessions() {
    let h = harness();
    post(&h.app, "/timer/start").await;

    let (status, body) = call::<StatusResponse>(&h.app, Method::GET, "/status", None).await;
    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body.last_action.as_deref(), Some("start"));
    assert_eq!(body.completed_sessions, 0);
    assert_eq!(body.timer.status, TimerStatus::Running);
    assert_eq!(body.port, 20554);
}

#[tokio::test]
async fn health_is_ok() {
    let h = harness();
    let (status, body) = call::<HealthResponse>(&h.app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap().status, "ok");
}
