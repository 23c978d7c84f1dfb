use std::time::Duration;

/// Trait for defining reconnection backoff policies
///
/// A policy maps the reconnection attempt number to the wait before the
/// next connection attempt. It must be deterministic: the same attempt
/// always yields the same delay. The attempt budget lives on the
/// connection manager, not on the policy.
pub trait ReconnectPolicy: Send + Sync {
    /// Get the delay before the reconnection attempt `attempt` (0-indexed)
    fn delay(&self, attempt: u32) -> Duration;

    /// Short name used in logs
    fn name(&self) -> &'static str;
}

impl<P: ReconnectPolicy + ?Sized> ReconnectPolicy for Box<P> {
    fn delay(&self, attempt: u32) -> Duration {
        (**self).delay(attempt)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Fixed escalation schedule
///
/// attempt 0 → 30s, attempts 1 and 2 → 15s, every later attempt → 60s.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedEscalation;

impl FixedEscalation {
    const SCHEDULE_MS: [u64; 3] = [30_000, 15_000, 15_000];
    const TAIL_MS: u64 = 60_000;
}

impl ReconnectPolicy for FixedEscalation {
    fn delay(&self, attempt: u32) -> Duration {
        let ms = Self::SCHEDULE_MS
            .get(attempt as usize)
            .copied()
            .unwrap_or(Self::TAIL_MS);
        Duration::from_millis(ms)
    }

    fn name(&self) -> &'static str {
        "fixed-escalation"
    }
}

/// Capped exponential backoff
///
/// Delays grow as `base * 1.5^attempt`, capped at `cap`.
#[derive(Debug, Clone, Copy)]
pub struct CappedExponential {
    base: Duration,
    cap: Duration,
}

impl CappedExponential {
    /// Growth factor applied per attempt
    pub const FACTOR: f64 = 1.5;
    /// Default base delay (3s)
    pub const DEFAULT_BASE: Duration = Duration::from_millis(3_000);
    /// Default cap (30s)
    pub const DEFAULT_CAP: Duration = Duration::from_millis(30_000);

    /// Create a new capped exponential policy
    ///
    /// # Arguments
    /// * `base` - Delay for attempt 0
    /// * `cap` - The maximum delay between reconnects
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self { base, cap }
    }

    /// Default cap with a custom base delay
    pub fn with_base(base: Duration) -> Self {
        Self::new(base, Self::DEFAULT_CAP)
    }
}

impl Default for CappedExponential {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BASE, Self::DEFAULT_CAP)
    }
}

impl ReconnectPolicy for CappedExponential {
    fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(i32::MAX as u32) as i32;
        let raw = self.base.as_millis() as f64 * Self::FACTOR.powi(exponent);
        let capped = raw.min(self.cap.as_millis() as f64);
        Duration::from_millis(capped.floor() as u64)
    }

    fn name(&self) -> &'static str {
        "capped-exponential"
    }
}

/// Fixed delay policy
///
/// Always waits the same amount of time between reconnection attempts
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl ReconnectPolicy for FixedDelay {
    fn delay(&self, _attempt: u32) -> Duration {
        self.delay
    }

    fn name(&self) -> &'static str {
        "fixed-delay"
    }
}
