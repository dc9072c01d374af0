//! Focus Timer - A persistent pomodoro countdown service for a browser start page
//!
//! The countdown survives restarts and sleep by persisting an absolute
//! deadline and re-deriving the remaining time from the wall clock, never by
//! decrementing a counter.

pub mod config;
pub mod state;
pub mod timer;
pub mod api;
pub mod services;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use state::AppState;
pub use timer::TimerEngine;
pub use api::create_router;
pub use utils::signals::shutdown_signal;
