//! Timer state structure and its display projection

use serde::{Deserialize, Serialize};

/// Session length used until the user picks another one (25 minutes)
pub const DEFAULT_DURATION_SECONDS: u32 = 25 * 60;
pub const MIN_DURATION_MINUTES: u32 = 5;
pub const MAX_DURATION_MINUTES: u32 = 60;
pub const MIN_DURATION_SECONDS: u32 = MIN_DURATION_MINUTES * 60;
pub const MAX_DURATION_SECONDS: u32 = MAX_DURATION_MINUTES * 60;

/// Below this many seconds the start page highlights the countdown
pub const URGENT_THRESHOLD_SECONDS: u32 = 60;

/// Lifecycle of the countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerStatus {
    Idle,
    Running,
    Paused,
    /// Only ever observed on the snapshot published for the expiry itself;
    /// the engine settles back to `Idle` in the same step.
    Expired,
}

impl TimerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerStatus::Idle => "idle",
            TimerStatus::Running => "running",
            TimerStatus::Paused => "paused",
            TimerStatus::Expired => "expired",
        }
    }
}

/// Countdown state owned by the engine.
///
/// `deadline_ms` is present exactly when `status` is `Running`. While running,
/// `remaining_seconds` is only a cached projection of the deadline.
#[derive(Debug, Clone, PartialEq)]
pub struct TimerState {
    pub duration_seconds: u32,
    pub remaining_seconds: u32,
    pub status: TimerStatus,
    pub deadline_ms: Option<i64>,
}

impl TimerState {
    /// Create an idle timer with the default session length
    pub fn new() -> Self {
        Self::idle(DEFAULT_DURATION_SECONDS)
    }

    /// Create an idle timer with a full session remaining
    pub fn idle(duration_seconds: u32) -> Self {
        Self {
            duration_seconds,
            remaining_seconds: duration_seconds,
            status: TimerStatus::Idle,
            deadline_ms: None,
        }
    }

    /// Create a stopped timer holding a specific remaining time
    pub fn stopped(duration_seconds: u32, remaining_seconds: u32, status: TimerStatus) -> Self {
        Self {
            duration_seconds,
            remaining_seconds: remaining_seconds.min(duration_seconds),
            status,
            deadline_ms: None,
        }
    }

    /// Check if the countdown is running
    pub fn is_running(&self) -> bool {
        self.status == TimerStatus::Running
    }

    /// Share of the session still left, in percent
    pub fn progress_percent(&self) -> f64 {
        progress_percent(self.remaining_seconds, self.duration_seconds)
    }

    /// Build the snapshot handed to the presentational layer
    pub fn display(&self) -> DisplayState {
        DisplayState {
            remaining_seconds: self.remaining_seconds,
            status: self.status,
            progress_percent: self.progress_percent(),
            duration_seconds: self.duration_seconds,
            formatted: format_clock(self.remaining_seconds),
            urgent: self.remaining_seconds < URGENT_THRESHOLD_SECONDS,
        }
    }
}

impl Default for TimerState {
    fn default() -> Self {
        Self::new()
    }
}

/// What the start page renders for the timer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayState {
    pub remaining_seconds: u32,
    pub status: TimerStatus,
    pub progress_percent: f64,
    pub duration_seconds: u32,
    /// Remaining time as `MM:SS`
    pub formatted: String,
    pub urgent: bool,
}

impl Default for DisplayState {
    fn default() -> Self {
        TimerState::new().display()
    }
}

pub fn progress_percent(remaining_seconds: u32, duration_seconds: u32) -> f64 {
    if duration_seconds == 0 {
        return 0.0;
    }
    let percent = 100.0 * f64::from(remaining_seconds) / f64::from(duration_seconds);
    percent.clamp(0.0, 100.0)
}

/// Format seconds as zero-padded `MM:SS`
pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Clamp a requested session length into the supported minute range
pub fn clamp_minutes(minutes: i64) -> u32 {
    // The clamp keeps the value inside u32 range
    minutes.clamp(i64::from(MIN_DURATION_MINUTES), i64::from(MAX_DURATION_MINUTES)) as u32
}
