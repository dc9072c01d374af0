//! Main application state management

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::Instant,
};
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{DisplayState, TimerStatus};
use crate::{
    services::{sound_alarm, AlarmConfig},
    timer::{TickOutcome, TimerEngine},
};

/// Main application state shared between the HTTP handlers and background tasks
#[derive(Debug)]
pub struct AppState {
    /// Countdown engine; every operation runs under this lock
    pub engine: Arc<Mutex<TimerEngine>>,
    /// Completion alarm settings
    pub alarm: AlarmConfig,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last action tracking
    pub last_action: Arc<Mutex<Option<String>>>,
    pub last_action_time: Arc<Mutex<Option<DateTime<Utc>>>>,
    /// Sessions that ran down to zero since the server started
    pub completed_sessions: AtomicU64,
    /// Channel for timer updates
    pub timer_update_tx: watch::Sender<DisplayState>,
    /// Keep the receiver alive to prevent channel closure
    pub _timer_update_rx: watch::Receiver<DisplayState>,
}

impl AppState {
    /// Create a new AppState around an engine. The engine's current state is
    /// published as-is; call [`restore`](Self::restore) to reconcile it.
    pub fn new(port: u16, host: String, engine: TimerEngine, alarm: AlarmConfig) -> Self {
        let (timer_update_tx, timer_update_rx) = watch::channel(engine.display_state());

        Self {
            engine: Arc::new(Mutex::new(engine)),
            alarm,
            start_time: Instant::now(),
            port,
            host,
            last_action: Arc::new(Mutex::new(None)),
            last_action_time: Arc::new(Mutex::new(None)),
            completed_sessions: AtomicU64::new(0),
            timer_update_tx,
            _timer_update_rx: timer_update_rx,
        }
    }

    /// Run an engine operation and publish the resulting display state.
    /// Callers decide what an expiry means for them.
    fn run<F>(&self, op: F) -> Result<(DisplayState, TickOutcome), String>
    where
        F: FnOnce(&mut TimerEngine) -> TickOutcome,
    {
        let mut engine = self.engine.lock()
            .map_err(|e| format!("Failed to lock timer engine: {}", e))?;

        let outcome = op(&mut *engine);
        let mut snapshot = engine.display_state();

        if outcome.is_expired() {
            snapshot.status = TimerStatus::Expired;
        }

        // Publish under the lock: watchers see operations in apply order
        if let Err(e) = self.timer_update_tx.send(snapshot.clone()) {
            warn!("Failed to send timer update: {}", e);
        }
        drop(engine);

        Ok((snapshot, outcome))
    }

    /// Apply a user-initiated operation and record it as the last action
    pub fn update_timer<F>(&self, action: &str, op: F) -> Result<DisplayState, String>
    where
        F: FnOnce(&mut TimerEngine) -> TickOutcome,
    {
        let (snapshot, outcome) = self.run(op)?;

        if let Ok(mut last_action) = self.last_action.lock() {
            *last_action = Some(action.to_string());
        }
        if let Ok(mut last_time) = self.last_action_time.lock() {
            *last_time = Some(Utc::now());
        }

        if outcome.is_expired() {
            self.complete_session(false);
        }

        Ok(snapshot)
    }

    /// Start or resume the countdown
    pub fn start(&self) -> Result<DisplayState, String> {
        info!("Starting countdown");
        self.update_timer("start", |engine| engine.start())
    }

    /// Pause the countdown
    pub fn pause(&self) -> Result<DisplayState, String> {
        info!("Pausing countdown");
        self.update_timer("pause", |engine| engine.pause())
    }

    /// Pause when running, start otherwise
    pub fn toggle(&self) -> Result<DisplayState, String> {
        self.update_timer("toggle", |engine| engine.toggle())
    }

    /// Reset to a full idle session
    pub fn reset(&self) -> Result<DisplayState, String> {
        info!("Resetting countdown");
        self.update_timer("reset", |engine| {
            engine.reset();
            TickOutcome::Stopped
        })
    }

    /// Change the session length in minutes (clamped to 5..=60)
    pub fn set_duration(&self, minutes: i64) -> Result<DisplayState, String> {
        info!("Setting countdown duration to {} minutes", minutes);
        self.update_timer("duration", |engine| {
            engine.set_duration(minutes);
            TickOutcome::Stopped
        })
    }

    /// Re-read persisted state after a reactivation (client refocus, wake-up)
    pub fn reconcile(&self) -> Result<DisplayState, String> {
        debug!("Reconciling countdown with storage");
        let (snapshot, outcome) = self.run(|engine| engine.reconcile())?;
        if outcome.is_expired() {
            self.complete_session(false);
        }
        Ok(snapshot)
    }

    /// Reconcile once at start-up. A session that finished while the server
    /// was down rings only if the alarm config allows it.
    pub fn restore(&self) -> Result<DisplayState, String> {
        let (snapshot, outcome) = self.run(|engine| engine.reconcile())?;
        info!(
            "Restored countdown: {} with {}s remaining",
            snapshot.status.as_str(),
            snapshot.remaining_seconds
        );
        if outcome.is_expired() {
            self.complete_session(true);
        }
        Ok(snapshot)
    }

    /// Recompute remaining time from the deadline
    pub fn tick(&self) -> Result<DisplayState, String> {
        let (snapshot, outcome) = self.run(|engine| engine.tick())?;
        if outcome.is_expired() {
            self.complete_session(false);
        }
        Ok(snapshot)
    }

    /// Get current display state without advancing anything
    pub fn get_display_state(&self) -> Result<DisplayState, String> {
        self.engine.lock()
            .map(|engine| engine.display_state())
            .map_err(|e| format!("Failed to lock timer engine: {}", e))
    }

    /// Subscribe to display state changes
    pub fn subscribe(&self) -> watch::Receiver<DisplayState> {
        self.timer_update_tx.subscribe()
    }

    pub fn completed_sessions(&self) -> u64 {
        self.completed_sessions.load(Ordering::SeqCst)
    }

    /// Count the finished session and fire the alarm without waiting on it
    fn complete_session(&self, restored: bool) {
        let total = self.completed_sessions.fetch_add(1, Ordering::SeqCst) + 1;
        info!("Focus session complete ({} this run)", total);

        if restored && !self.alarm.on_restore {
            info!("Session finished while offline, skipping alarm");
            return;
        }

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("No async runtime available, skipping completion alarm");
            return;
        };

        let alarm = self.alarm.clone();
        handle.spawn(async move {
            if let Err(e) = sound_alarm(&alarm).await {
                warn!("Completion alarm failed: {}", e);
            }
        });
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let last_action = self.last_action.lock().ok().and_then(|a| a.clone());
        let last_action_time = self.last_action_time.lock().ok().and_then(|t| *t);
        (last_action, last_action_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::{engine::KEY_DEADLINE, KeyValueStore, ManualClock, MemoryStore};
    use std::{path::Path, time::Duration};

    const T0: i64 = 1_700_000_000_000;

    fn app(clock: &ManualClock) -> AppState {
        app_with(MemoryStore::new(), clock, AlarmConfig::default())
    }

    fn app_with(store: MemoryStore, clock: &ManualClock, alarm: AlarmConfig) -> AppState {
        let engine = TimerEngine::new(Box::new(store), Arc::new(clock.clone()));
        AppState::new(20554, "127.0.0.1".to_string(), engine, alarm)
    }

    /// Store holding a deadline that passed a minute before `T0`
    fn store_with_missed_deadline() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.set(KEY_DEADLINE, &(T0 - 60_000).to_string()).unwrap();
        store
    }

    fn touch_alarm(marker: &Path, on_restore: bool) -> AlarmConfig {
        AlarmConfig::new(Some(format!("touch '{}'", marker.to_string_lossy())), on_restore)
    }

    async fn appears_within(path: &Path, limit: Duration) -> bool {
        let started = Instant::now();
        while started.elapsed() < limit {
            if path.exists() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        path.exists()
    }

    #[test]
    fn operations_record_last_action() {
        let clock = ManualClock::new(0);
        let state = app(&clock);

        state.start().unwrap();
        let (action, time) = state.get_last_action();
        assert_eq!(action.as_deref(), Some("start"));
        assert!(time.is_some());

        // ticks are not user actions
        state.tick().unwrap();
        assert_eq!(state.get_last_action().0.as_deref(), Some("start"));
    }

    #[test]
    fn expiry_publishes_expired_once_then_idle() {
        let clock = ManualClock::new(0);
        let state = app(&clock);
        let rx = state.subscribe();

        state.start().unwrap();
        clock.advance(Duration::from_secs(1500));

        let snapshot = state.tick().unwrap();
        assert_eq!(snapshot.status, TimerStatus::Expired);
        assert_eq!(rx.borrow().status, TimerStatus::Expired);
        assert_eq!(state.completed_sessions(), 1);

        let snapshot = state.tick().unwrap();
        assert_eq!(snapshot.status, TimerStatus::Idle);
        assert_eq!(snapshot.remaining_seconds, 0);
        assert_eq!(state.get_display_state().unwrap().status, TimerStatus::Idle);
        assert_eq!(state.completed_sessions(), 1);
    }

    #[test]
    fn published_status_follows_engine_under_concurrent_operations() {
        let clock = ManualClock::new(T0);
        let state = Arc::new(app(&clock));
        let rx = state.subscribe();

        for _ in 0..2_000 {
            state.reset().unwrap();
            state.start().unwrap();
            clock.advance(Duration::from_secs(10));

            let pauser = {
                let state = Arc::clone(&state);
                std::thread::spawn(move || state.pause().unwrap())
            };
            let starter = {
                let state = Arc::clone(&state);
                std::thread::spawn(move || state.start().unwrap())
            };
            pauser.join().unwrap();
            starter.join().unwrap();

            let engine_status = state.get_display_state().unwrap().status;
            let published_status = rx.borrow().status;
            assert_eq!(published_status, engine_status);
        }
    }

    #[tokio::test]
    async fn session_finished_offline_counts_and_rings_once() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("rang");
        let clock = ManualClock::new(T0);
        let state = app_with(store_with_missed_deadline(), &clock, touch_alarm(&marker, true));

        let snapshot = state.restore().unwrap();
        assert_eq!(snapshot.status, TimerStatus::Expired);
        assert_eq!(snapshot.remaining_seconds, 0);
        assert_eq!(state.completed_sessions(), 1);
        assert!(appears_within(&marker, Duration::from_secs(5)).await);

        // nothing is left to finish on a second pass
        let snapshot = state.restore().unwrap();
        assert_eq!(snapshot.status, TimerStatus::Idle);
        assert_eq!(state.completed_sessions(), 1);
    }

    #[tokio::test]
    async fn restore_alarm_can_be_silenced() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("rang");
        let clock = ManualClock::new(T0);
        let state = app_with(store_with_missed_deadline(), &clock, touch_alarm(&marker, false));

        let snapshot = state.restore().unwrap();
        assert_eq!(snapshot.status, TimerStatus::Expired);
        assert_eq!(state.completed_sessions(), 1);
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!marker.exists());

        // sessions that finish while the server is up still ring
        state.start().unwrap();
        clock.advance(Duration::from_secs(1500));
        assert_eq!(state.tick().unwrap().status, TimerStatus::Expired);
        assert_eq!(state.completed_sessions(), 2);
        assert!(appears_within(&marker, Duration::from_secs(5)).await);
    }

    #[test]
    fn uptime_is_formatted_in_seconds_at_start() {
        let clock = ManualClock::new(0);
        let state = app(&clock);
        assert!(state.get_uptime().ends_with('s'));
    }
}
