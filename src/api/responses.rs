//! API request and response structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::{DisplayState, TimerStatus};

/// Response for timer operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub timer: DisplayState,
}

impl TimerResponse {
    /// Create a new timer response; `status` mirrors the countdown status
    pub fn new(message: String, timer: DisplayState) -> Self {
        Self {
            status: timer.status.as_str().to_string(),
            message,
            timestamp: Utc::now(),
            timer,
        }
    }

    pub fn is_running(&self) -> bool {
        self.timer.status == TimerStatus::Running
    }
}

/// Body of `PUT /timer/duration`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DurationRequest {
    /// Session length in minutes; clamped to 5..=60
    pub minutes: i64,
}

/// Status response with server metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub timer: DisplayState,
    pub completed_sessions: u64,
    pub uptime: String,
    pub port: u16,
    pub host: String,
    pub last_action: Option<String>,
    pub last_action_time: Option<DateTime<Utc>>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
