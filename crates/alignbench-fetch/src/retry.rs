//! Retry policy value: max attempts plus an exponential backoff function.
//!
//! Passed into the fetcher rather than hard-coded in its control flow, so
//! callers (and tests) choose how patient to be.

use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the initial attempt; 0 disables retrying.
    pub max_retries: u32,
    /// Backoff base in seconds: the n-th retry waits `base^n` seconds.
    pub backoff_base_secs: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base_secs: 2.0,
        }
    }
}

impl RetryPolicy {
    /// No waiting between attempts; test and dry-run friendly.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff_base_secs: 0.0,
        }
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        Duration::from_secs_f64(self.backoff_base_secs.powi(attempt as i32).max(0.0))
    }
}
