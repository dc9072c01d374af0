//! Side-effect services module
//!
//! This module contains the effects applied around timer transitions,
//! currently the completion alarm.

pub mod alarm;

// Re-export main items
pub use alarm::*;
