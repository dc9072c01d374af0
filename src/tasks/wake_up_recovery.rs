//! Wake-up recovery background task

use std::{sync::Arc, time::{Duration, Instant}};
use chrono::Utc;
use tokio::time::interval;
use tracing::{info, warn};

use crate::state::AppState;

/// Wall-clock gain over the monotonic clock that counts as a sleep/resume
pub const WAKE_JUMP_THRESHOLD_MS: i64 = 2_000;

/// Background task that detects system wake-up and reconciles the countdown.
///
/// The monotonic clock stops while the machine sleeps but the wall clock does
/// not, so a gap between the two means time passed that no tick observed.
pub async fn wake_up_recovery_task(state: Arc<AppState>, check_every: Duration) {
    info!("Starting wake-up recovery task ({}s interval)", check_every.as_secs());

    let mut interval = interval(check_every);
    let mut last_wall_ms = Utc::now().timestamp_millis();
    let mut last_mono = Instant::now();

    loop {
        interval.tick().await;

        let wall_ms = Utc::now().timestamp_millis();
        let mono_elapsed_ms = last_mono.elapsed().as_millis() as i64;

        if let Some(jump) = clock_jump(wall_ms - last_wall_ms, mono_elapsed_ms) {
            info!("Wall clock jumped {}ms (wake-up detected), reconciling countdown", jump);

            if let Err(e) = state.reconcile() {
                warn!("Failed to reconcile countdown after wake-up: {}", e);
            }
        }

        last_wall_ms = wall_ms;
        last_mono = Instant::now();
    }
}

/// Amount by which wall time outran monotonic time, if it counts as a jump
pub fn clock_jump(wall_elapsed_ms: i64, mono_elapsed_ms: i64) -> Option<i64> {
    let jump = wall_elapsed_ms - mono_elapsed_ms;
    (jump.abs() >= WAKE_JUMP_THRESHOLD_MS).then_some(jump)
}
