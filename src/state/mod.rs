//! State management module
//!
//! This module contains the timer state model and the shared application state.

pub mod app_state;
pub mod timer_state;

// Re-export main types
pub use app_state::AppState;
pub use timer_state::{DisplayState, TimerState, TimerStatus};
