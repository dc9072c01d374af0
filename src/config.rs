//! Configuration and CLI argument handling

use std::{path::PathBuf, time::Duration};
use clap::Parser;

use crate::{
    services::AlarmConfig,
    tasks::ticker::{MAX_TICK_INTERVAL, MIN_TICK_INTERVAL},
};

/// CLI argument parsing structure
#[derive(Parser, Debug)]
#[command(name = "focus-timer")]
#[command(about = "A persistent pomodoro countdown service for a browser start page")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// JSON file holding the persisted countdown
    #[arg(short, long, default_value = "focus-timer.json")]
    pub store: PathBuf,

    /// Tick interval in milliseconds while the countdown runs (50-500)
    #[arg(long, default_value = "500")]
    pub tick_ms: u64,

    /// Shell command run when a session finishes (default: terminal bell)
    #[arg(long)]
    pub alarm_command: Option<String>,

    /// Stay silent for sessions that finished while the server was down
    #[arg(long)]
    pub no_restore_alarm: bool,

    /// Seconds between wake-up (clock jump) checks
    #[arg(long, default_value = "15")]
    pub wake_check_secs: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    /// Tick period, kept at or below half a second
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms).clamp(MIN_TICK_INTERVAL, MAX_TICK_INTERVAL)
    }

    pub fn wake_check_interval(&self) -> Duration {
        Duration::from_secs(self.wake_check_secs.max(1))
    }

    pub fn alarm(&self) -> AlarmConfig {
        AlarmConfig::new(self.alarm_command.clone(), !self.no_restore_alarm)
    }
}
