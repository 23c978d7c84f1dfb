//! Severity and priority of a lifecycle transition

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered low < medium < high
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse class of a lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateClass {
    Running,
    Paused,
    Terminated,
    Other,
}

impl StateClass {
    /// Classify a state name, case-insensitively
    pub fn of(state: &str) -> Self {
        match state.trim().to_ascii_lowercase().as_str() {
            "running" | "active" | "ready" => StateClass::Running,
            "hibernated" | "hibernating" | "paused" | "suspended" => StateClass::Paused,
            "terminated" | "terminating" | "failed" | "deleted" | "stopped" | "error" => {
                StateClass::Terminated
            }
            _ => StateClass::Other,
        }
    }
}

/// Severity and priority of a transition into `next`
pub fn classify(next: &str) -> (Severity, Priority) {
    match StateClass::of(next) {
        StateClass::Running => (Severity::Success, Priority::Medium),
        StateClass::Paused => (Severity::Warning, Priority::Medium),
        StateClass::Terminated => (Severity::Error, Priority::High),
        StateClass::Other => (Severity::Info, Priority::Low),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_by_target_state() {
        assert_eq!(classify("running"), (Severity::Success, Priority::Medium));
        assert_eq!(classify("hibernated"), (Severity::Warning, Priority::Medium));
        assert_eq!(classify("terminated"), (Severity::Error, Priority::High));
        assert_eq!(classify("Failed"), (Severity::Error, Priority::High));
        assert_eq!(classify("pending"), (Severity::Info, Priority::Low));
    }

    #[test]
    fn test_priority_order() {
        assert!(Priority::High > Priority::Medium);
        assert!(Priority::Medium > Priority::Low);
    }
}
