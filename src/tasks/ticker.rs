//! Countdown ticker background task

use std::{sync::Arc, time::Duration};
use tokio::time::{sleep, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::state::{AppState, TimerStatus};

/// Slowest tick period that still refreshes the display twice a second
pub const MAX_TICK_INTERVAL: Duration = Duration::from_millis(500);
pub const MIN_TICK_INTERVAL: Duration = Duration::from_millis(50);

/// Background task that drives `tick()` while the countdown runs.
///
/// While the timer is stopped the task parks on the display-state channel, so
/// a pause or reset stops ticking without holding any handle to cancel.
pub async fn ticker_task(state: Arc<AppState>, tick_interval: Duration) {
    let tick_interval = tick_interval.clamp(MIN_TICK_INTERVAL, MAX_TICK_INTERVAL);
    info!("Starting countdown ticker task ({}ms interval)", tick_interval.as_millis());

    let mut timer_rx = state.subscribe();

    loop {
        let running = timer_rx.borrow_and_update().status == TimerStatus::Running;

        if !running {
            // Wait for a state change notification
            if timer_rx.changed().await.is_err() {
                error!("Timer update channel closed, stopping ticker");
                return;
            }
            continue;
        }

        debug!("Countdown running, ticking every {}ms", tick_interval.as_millis());
        let mut interval = tokio::time::interval(tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match state.tick() {
                        Ok(snapshot) if snapshot.status == TimerStatus::Running => {}
                        Ok(snapshot) => {
                            debug!("Countdown left running state ({}), ticker idle", snapshot.status.as_str());
                            break;
                        }
                        Err(e) => {
                            error!("Failed to tick countdown: {}", e);
                            // Wait a bit before retrying
                            sleep(Duration::from_secs(1)).await;
                        }
                    }
                }

                // State change - stop ticking if the countdown was paused or reset
                changed = timer_rx.changed() => {
                    if changed.is_err() {
                        error!("Timer update channel closed, stopping ticker");
                        return;
                    }
                    if timer_rx.borrow().status != TimerStatus::Running {
                        debug!("Countdown stopped, ticker idle");
                        break;
                    }
                }
            }
        }
    }
}
