//! Utility functions module
//!
//! Process-level helpers used by the server binary, such as shutdown handling.

pub mod signals;

pub use signals::shutdown_signal;
