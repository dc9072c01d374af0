//! Completion alarm
//!
//! Sounding the alarm is best-effort: callers spawn it and only log failures,
//! the countdown state has already moved on by the time it runs.

use std::{io::Write, time::Duration};
use tokio::{process::Command, time::timeout};
use tracing::{debug, info};

/// Longest an alarm command may run before it is killed
pub const ALARM_TIMEOUT: Duration = Duration::from_secs(30);

/// How the completion alarm is produced
#[derive(Debug, Clone, Default)]
pub struct AlarmConfig {
    /// Shell command to run when a session finishes, e.g. `paplay bell.oga`.
    /// Without one the terminal bell is rung.
    pub command: Option<String>,
    /// Whether a session found already finished at start-up still rings
    pub on_restore: bool,
}

impl AlarmConfig {
    pub fn new(command: Option<String>, on_restore: bool) -> Self {
        Self {
            command: command.filter(|c| !c.trim().is_empty()),
            on_restore,
        }
    }
}

/// Produce the completion alarm once
pub async fn sound_alarm(config: &AlarmConfig) -> Result<(), String> {
    match &config.command {
        Some(command) => run_alarm_command(command, ALARM_TIMEOUT).await,
        None => ring_terminal_bell(),
    }
}

async fn run_alarm_command(command: &str, limit: Duration) -> Result<(), String> {
    debug!("Running alarm command: {}", command);

    // The child is killed if the timeout drops the pending output future
    let pending = Command::new("sh")
        .args(["-c", command])
        .kill_on_drop(true)
        .output();

    let output = timeout(limit, pending)
        .await
        .map_err(|_| format!("Alarm command timed out after {}s", limit.as_secs_f32()))?
        .map_err(|e| format!("Failed to execute alarm command: {}", e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("Alarm command failed: {}", stderr.trim()));
    }

    info!("Alarm command completed");
    Ok(())
}

fn ring_terminal_bell() -> Result<(), String> {
    let mut stdout = std::io::stdout();
    stdout
        .write_all(b"\x07")
        .and_then(|_| stdout.flush())
        .map_err(|e| format!("Failed to ring terminal bell: {}", e))?;

    debug!("Terminal bell rung");
    Ok(())
}
