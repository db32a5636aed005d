use std::time::Duration;

/// Trait for defining reconnection strategies
///
/// The manager asks the strategy for a delay each time a live transport
/// closes unexpectedly. Returning `None` means the cap has been reached and
/// the session falls back to simulation for good.
pub trait ReconnectionStrategy: Send + Sync {
    /// Get the delay before the next reconnection attempt
    ///
    /// # Arguments
    /// * `attempt` - The reconnection attempt number (0-indexed)
    ///
    /// # Returns
    /// * `Some(duration)` - Wait this long before reconnecting
    /// * `None` - Stop reconnecting
    fn next_delay(&self, attempt: usize) -> Option<Duration>;

    /// Check if we should continue reconnecting
    fn should_reconnect(&self, attempt: usize) -> bool;
}

/// Exponential backoff reconnection strategy
///
/// Delays between reconnection attempts grow exponentially:
/// initial_delay * 2^attempt, capped at max_delay
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial_delay: Duration,
    max_delay: Duration,
    max_attempts: Option<usize>,
}

impl ExponentialBackoff {
    /// Create a new exponential backoff strategy
    ///
    /// # Arguments
    /// * `initial_delay` - The delay before the first reconnect
    /// * `max_delay` - The maximum delay between reconnects
    /// * `max_attempts` - Maximum number of attempts (None = unlimited)
    pub fn new(initial_delay: Duration, max_delay: Duration, max_attempts: Option<usize>) -> Self {
        Self {
            initial_delay,
            max_delay,
            max_attempts,
        }
    }

    /// Maximum number of attempts, if bounded
    pub fn max_attempts(&self) -> Option<usize> {
        self.max_attempts
    }
}

impl Default for ExponentialBackoff {
    /// 1s, 2s, 4s, 8s, 16s and then give up.
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(30), Some(5))
    }
}

impl ReconnectionStrategy for ExponentialBackoff {
    fn next_delay(&self, attempt: usize) -> Option<Duration> {
        if !self.should_reconnect(attempt) {
            return None;
        }

        let factor = u32::try_from(attempt)
            .ok()
            .and_then(|shift| 1u64.checked_shl(shift))
            .unwrap_or(u64::MAX);
        let delay = (self.initial_delay.as_millis() as u64).saturating_mul(factor);
        let delay = Duration::from_millis(delay.min(self.max_delay.as_millis() as u64));
        Some(delay)
    }

    fn should_reconnect(&self, attempt: usize) -> bool {
        self.max_attempts.map_or(true, |max| attempt < max)
    }
}

/// Fixed delay reconnection strategy
///
/// Always waits the same amount of time between reconnection attempts
#[derive(Debug, Clone)]
pub struct FixedDelay {
    delay: Duration,
    max_attempts: Option<usize>,
}

impl FixedDelay {
    pub fn new(delay: Duration, max_attempts: Option<usize>) -> Self {
        Self { delay, max_attempts }
    }
}

impl ReconnectionStrategy for FixedDelay {
    fn next_delay(&self, attempt: usize) -> Option<Duration> {
        if !self.should_reconnect(attempt) {
            return None;
        }
        Some(self.delay)
    }

    fn should_reconnect(&self, attempt: usize) -> bool {
        self.max_attempts.map_or(true, |max| attempt < max)
    }
}

/// Never reconnect strategy
///
/// The first unexpected close goes straight to `Failed` and simulation.
#[derive(Debug, Clone)]
pub struct NeverReconnect;

impl ReconnectionStrategy for NeverReconnect {
    fn next_delay(&self, _attempt: usize) -> Option<Duration> {
        None
    }

    fn should_reconnect(&self, _attempt: usize) -> bool {
        false
    }
}
