//! HTTP endpoint handlers

use std::sync::Arc;
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use tracing::{error, info};

use crate::state::{AppState, DisplayState};
use super::responses::{DurationRequest, HealthResponse, StatusResponse, TimerResponse};

/// Wrap an engine result into a JSON response, logging failures
fn respond(
    result: Result<DisplayState, String>,
    action: &str,
    message: &str,
) -> Result<Json<TimerResponse>, StatusCode> {
    match result {
        Ok(timer) => {
            info!("{} endpoint called - {}s remaining ({})",
                  action, timer.remaining_seconds, timer.status.as_str());
            Ok(Json(TimerResponse::new(message.to_string(), timer)))
        }
        Err(e) => {
            error!("Failed to {} countdown: {}", action, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handle GET /timer - Current display state, refreshed against the deadline
pub async fn timer_handler(State(state): State<Arc<AppState>>) -> Result<Json<DisplayState>, StatusCode> {
    state.tick().map(Json).map_err(|e| {
        error!("Failed to read countdown: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

/// Handle POST /timer/start - Start or resume the countdown
pub async fn start_handler(State(state): State<Arc<AppState>>) -> Result<Json<TimerResponse>, StatusCode> {
    respond(state.start(), "start", "Countdown started")
}

/// Handle POST /timer/pause - Pause the countdown
pub async fn pause_handler(State(state): State<Arc<AppState>>) -> Result<Json<TimerResponse>, StatusCode> {
    respond(state.pause(), "pause", "Countdown paused")
}

/// Handle POST /timer/toggle - Start when stopped, pause when running
pub async fn toggle_handler(State(state): State<Arc<AppState>>) -> Result<Json<TimerResponse>, StatusCode> {
    respond(state.toggle(), "toggle", "Countdown toggled")
}

/// Handle POST /timer/reset - Back to a full idle session
pub async fn reset_handler(State(state): State<Arc<AppState>>) -> Result<Json<TimerResponse>, StatusCode> {
    respond(state.reset(), "reset", "Countdown reset")
}

/// Handle PUT /timer/duration - Change session length and reset
pub async fn duration_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DurationRequest>,
) -> Result<Json<TimerResponse>, StatusCode> {
    let result = state.set_duration(request.minutes);
    let message = match &result {
        Ok(timer) => format!("Session length set to {} minutes", timer.duration_seconds / 60),
        Err(_) => String::new(),
    };
    respond(result, "duration", &message)
}

/// Handle POST /timer/reconcile - Client came back into focus; re-read storage
pub async fn reconcile_handler(State(state): State<Arc<AppState>>) -> Result<Json<TimerResponse>, StatusCode> {
    respond(state.reconcile(), "reconcile", "Countdown reconciled")
}

/// Handle GET /status - Return timer state and server metadata
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Result<Json<StatusResponse>, StatusCode> {
    let timer = match state.tick() {
        Ok(t) => t,
        Err(e) => {
            error!("Failed to get timer state: {}", e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let (last_action, last_action_time) = state.get_last_action();

    Ok(Json(StatusResponse {
        timer,
        completed_sessions: state.completed_sessions(),
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    }))
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
