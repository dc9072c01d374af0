//! Countdown timer engine
//!
//! The engine turns user intents into a persisted absolute deadline and
//! re-derives the remaining time from `deadline - now` whenever it is asked.
//! It holds no timer handles: whoever schedules it calls [`TimerEngine::tick`]
//! while the countdown runs and simply stops calling once it does not.
//!
//! Transitions are pure with respect to side effects. When a countdown
//! finishes, the operation returns [`TickOutcome::Expired`] exactly once and
//! the caller decides how to sound the alarm.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{clock::Clock, store::KeyValueStore};
use crate::state::timer_state::{
    clamp_minutes, DisplayState, TimerState, TimerStatus, DEFAULT_DURATION_SECONDS,
    MAX_DURATION_SECONDS, MIN_DURATION_SECONDS,
};

pub const KEY_DURATION: &str = "pomodoro.durationSeconds";
pub const KEY_DEADLINE: &str = "pomodoro.deadlineEpochMs";
pub const KEY_REMAINING: &str = "pomodoro.remainingSeconds";

/// How far a persisted deadline may sit beyond one full session before it is
/// treated as corrupt rather than as ordinary clock skew.
const DEADLINE_SKEW_MS: i64 = 5_000;

/// Result of an engine operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Countdown is not running (idle or paused)
    Stopped,
    /// Countdown is running with this many whole seconds left
    Running { remaining_seconds: u32 },
    /// Countdown just reached zero. Reported once per session.
    Expired,
}

impl TickOutcome {
    pub fn is_expired(&self) -> bool {
        matches!(self, TickOutcome::Expired)
    }
}

/// Pomodoro countdown engine over injected clock and storage
pub struct TimerEngine {
    store: Box<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    state: TimerState,
}

impl std::fmt::Debug for TimerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerEngine")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl TimerEngine {
    /// Create an engine with default state. Call [`reconcile`](Self::reconcile)
    /// to pick up whatever the store already holds.
    pub fn new(store: Box<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            state: TimerState::new(),
        }
    }

    /// Create an engine and immediately restore persisted state
    pub fn restore(store: Box<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> (Self, TickOutcome) {
        let mut engine = Self::new(store, clock);
        let outcome = engine.reconcile();
        (engine, outcome)
    }

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn display_state(&self) -> DisplayState {
        self.state.display()
    }

    /// Rebuild state from storage against the current wall clock.
    ///
    /// Used on start-up and on every reactivation (resume from sleep, a client
    /// coming back into focus). A deadline already in the past yields
    /// `Expired` once and is removed, so repeating this never expires twice.
    pub fn reconcile(&mut self) -> TickOutcome {
        self.store.refresh();

        let duration = self.read_duration();

        if let Some(deadline) = self.read_number(KEY_DEADLINE) {
            self.state = TimerState {
                duration_seconds: duration,
                remaining_seconds: duration,
                status: TimerStatus::Running,
                deadline_ms: Some(deadline),
            };
            let outcome = self.project(deadline);
            debug!("Reconciled running countdown: {:?}", outcome);
            return outcome;
        }

        let remaining = match self.read_number(KEY_REMAINING) {
            Some(value) if value <= i64::from(duration) => value as u32,
            Some(value) => {
                warn!("Stored remaining time {}s exceeds session length {}s, ignoring", value, duration);
                duration
            }
            None => duration,
        };

        let status = if remaining > 0 && remaining < duration {
            TimerStatus::Paused
        } else {
            TimerStatus::Idle
        };
        self.state = TimerState::stopped(duration, remaining, status);
        debug!("Reconciled stopped countdown: {:?} with {}s left", status, remaining);
        TickOutcome::Stopped
    }

    /// Start or resume the countdown
    pub fn start(&mut self) -> TickOutcome {
        if self.state.is_running() {
            return self.tick();
        }

        if self.state.remaining_seconds == 0 {
            self.state.remaining_seconds = self.state.duration_seconds;
        }

        let remaining = self.state.remaining_seconds;
        let deadline = self.clock.now_ms() + i64::from(remaining) * 1000;

        self.persist(KEY_DEADLINE, &deadline.to_string());
        self.forget(KEY_REMAINING);

        self.state.status = TimerStatus::Running;
        self.state.deadline_ms = Some(deadline);

        info!("Countdown started with {}s remaining", remaining);
        TickOutcome::Running { remaining_seconds: remaining }
    }

    /// Freeze the countdown at its current remaining time
    pub fn pause(&mut self) -> TickOutcome {
        let Some(deadline) = self.state.deadline_ms else {
            return TickOutcome::Stopped;
        };

        let diff = deadline - self.clock.now_ms();
        if diff <= 0 {
            // The deadline passed before any tick observed it
            return self.expire();
        }

        let remaining = ceil_seconds(diff).min(self.state.duration_seconds);
        self.persist(KEY_REMAINING, &remaining.to_string());
        self.forget(KEY_DEADLINE);

        self.state = TimerState::stopped(self.state.duration_seconds, remaining, TimerStatus::Paused);

        info!("Countdown paused with {}s remaining", remaining);
        TickOutcome::Stopped
    }

    /// Pause when running, start otherwise
    pub fn toggle(&mut self) -> TickOutcome {
        if self.state.is_running() {
            self.pause()
        } else {
            self.start()
        }
    }

    /// Discard any progress and go back to a full, idle session
    pub fn reset(&mut self) {
        let duration = self.state.duration_seconds;

        self.forget(KEY_DEADLINE);
        self.persist(KEY_REMAINING, &duration.to_string());
        self.state = TimerState::idle(duration);

        info!("Countdown reset to {}s", duration);
    }

    /// Change the session length. Out-of-range values are clamped to
    /// 5..=60 minutes and any run in progress is discarded.
    /// Returns the minutes actually applied.
    pub fn set_duration(&mut self, minutes: i64) -> u32 {
        let applied = clamp_minutes(minutes);
        if i64::from(applied) != minutes {
            debug!("Requested duration {}min clamped to {}min", minutes, applied);
        }

        let duration = applied * 60;
        self.persist(KEY_DURATION, &duration.to_string());
        self.state.duration_seconds = duration;
        self.reset();

        applied
    }

    /// Re-derive remaining time from the deadline. No-op unless running.
    pub fn tick(&mut self) -> TickOutcome {
        match self.state.deadline_ms {
            Some(deadline) => self.project(deadline),
            None => TickOutcome::Stopped,
        }
    }

    fn project(&mut self, deadline: i64) -> TickOutcome {
        let now = self.clock.now_ms();
        let mut diff = deadline - now;
        if diff <= 0 {
            return self.expire();
        }

        let duration_ms = i64::from(self.state.duration_seconds) * 1000;
        if diff > duration_ms + DEADLINE_SKEW_MS {
            warn!(
                "Deadline lies {}ms ahead, beyond a {}s session; restarting from a full session",
                diff, self.state.duration_seconds
            );
            let rebased = now + duration_ms;
            self.persist(KEY_DEADLINE, &rebased.to_string());
            self.state.deadline_ms = Some(rebased);
            diff = duration_ms;
        }

        let remaining = ceil_seconds(diff).min(self.state.duration_seconds);
        self.state.remaining_seconds = remaining;
        TickOutcome::Running { remaining_seconds: remaining }
    }

    fn expire(&mut self) -> TickOutcome {
        self.forget(KEY_DEADLINE);
        self.persist(KEY_REMAINING, "0");
        self.state = TimerState::stopped(self.state.duration_seconds, 0, TimerStatus::Idle);

        info!("Countdown finished");
        TickOutcome::Expired
    }

    fn read_duration(&self) -> u32 {
        match self.read_number(KEY_DURATION) {
            Some(value)
                if (i64::from(MIN_DURATION_SECONDS)..=i64::from(MAX_DURATION_SECONDS)).contains(&value) =>
            {
                value as u32
            }
            Some(value) => {
                warn!("Stored duration {}s is out of range, using default", value);
                DEFAULT_DURATION_SECONDS
            }
            None => DEFAULT_DURATION_SECONDS,
        }
    }

    /// Non-numeric and negative values read as absent
    fn read_number(&self, key: &str) -> Option<i64> {
        let raw = self.store.get(key)?;
        match raw.trim().parse::<i64>() {
            Ok(value) if value >= 0 => Some(value),
            Ok(value) => {
                warn!("Ignoring negative stored value {} for {}", value, key);
                None
            }
            Err(_) => {
                warn!("Ignoring malformed stored value {:?} for {}", raw, key);
                None
            }
        }
    }

    fn persist(&mut self, key: &str, value: &str) {
        if let Err(e) = self.store.set(key, value) {
            warn!("Failed to persist {}: {}", key, e);
        }
    }

    fn forget(&mut self, key: &str) {
        if let Err(e) = self.store.delete(key) {
            warn!("Failed to remove {}: {}", key, e);
        }
    }
}

/// Whole seconds covering `ms`, rounding up
fn ceil_seconds(ms: i64) -> u32 {
    if ms <= 0 {
        return 0;
    }
    u32::try_from(ms.saturating_add(999) / 1000).unwrap_or(u32::MAX)
}
