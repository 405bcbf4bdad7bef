use std::time::Duration;

/// Decides whether, and after how long, to reconnect.
pub trait ReconnectPolicy: Send + Sync {
    /// Delay before reconnect attempt number `attempt` (1-based), or `None`
    /// once the budget is spent.
    fn next_delay(&self, attempt: u32) -> Option<Duration>;
}

/// Same delay before every attempt, up to `max_attempts` attempts.
#[derive(Debug, Clone, Copy)]
pub struct FixedInterval {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl ReconnectPolicy for FixedInterval {
    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        (attempt <= self.max_attempts).then_some(self.interval)
    }
}
