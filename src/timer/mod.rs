//! Countdown timer engine and the ports it runs against
//!
//! The engine never reads the system clock or touches storage directly; both
//! are injected so the whole state machine can run against fakes.

pub mod clock;
pub mod engine;
pub mod store;

// Re-export main types
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{TickOutcome, TimerEngine};
pub use store::{FileStore, KeyValueStore, MemoryStore};
