use std::time::Duration;

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_RECONNECT_DELAY: Duration = Duration::from_secs(10);

/// How long a connection manager waits before the next connect attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPolicy {
    Fixed { delay: Duration },
    Exponential { initial: Duration, max: Duration },
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::Fixed {
            delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Backoff {
    policy: ReconnectPolicy,
    current: Duration,
}

impl Backoff {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            current: Self::initial_delay(policy),
        }
    }

    fn initial_delay(policy: ReconnectPolicy) -> Duration {
        match policy {
            ReconnectPolicy::Fixed { delay } => delay,
            ReconnectPolicy::Exponential { initial, .. } => initial,
        }
    }

    /// Returns the delay to wait now and advances the schedule.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        if let ReconnectPolicy::Exponential { max, .. } = self.policy {
            self.current = (self.current + self.current).min(max);
        }
        delay
    }

    /// Called once a connection is ready again.
    pub fn reset(&mut self) {
        self.current = Self::initial_delay(self.policy);
    }
}
