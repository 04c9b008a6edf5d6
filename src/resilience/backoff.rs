//! Exponential backoff with jitter for confirmation polling.

use std::time::Duration;

use rand::Rng;

/// Delay schedule for polling a transaction until it commits.
///
/// Doubles from `initial` up to `max`, adding up to 10% jitter.
#[derive(Debug, Clone)]
pub struct PollBackoff {
    initial_ms: u64,
    max_ms: u64,
    attempt: u32,
}

impl PollBackoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        let initial_ms = initial.as_millis().max(1) as u64;
        Self {
            initial_ms,
            max_ms: (max.as_millis() as u64).max(initial_ms),
            attempt: 0,
        }
    }

    /// Number of delays handed out so far.
    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    /// Delay before the next poll.
    pub fn next_delay(&mut self) -> Duration {
        self.attempt = self.attempt.saturating_add(1);
        let exponential = 2u64.saturating_pow(self.attempt - 1);
        let capped = self.initial_ms.saturating_mul(exponential).min(self.max_ms);

        let jitter_range = capped / 10;
        let jitter = if jitter_range > 0 {
            rand::thread_rng().gen_range(0..jitter_range)
        } else {
            0
        };

        Duration::from_millis(capped + jitter)
    }
}
