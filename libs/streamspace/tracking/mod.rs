//! Lifecycle transition tracking over pushed snapshots

pub mod diff;
pub mod severity;

pub use diff::{StateDiffTracker, Tracked, TransitionEvent};
pub use severity::{classify, Priority, Severity, StateClass};
