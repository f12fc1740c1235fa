//! Shared retry-with-backoff policy.
//!
//! The embedder, the generator, and the job queue all retry transient
//! failures with the same shape: a fixed attempt budget and exponentially
//! growing delays. One policy type keeps the three call sites from drifting.

use std::future::Future;
use std::time::Duration;

/// Exponential backoff policy: `initial_delay * multiplier^(attempt - 1)`.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    /// Total attempt budget, including the first attempt
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub multiplier: f64,
}

impl BackoffPolicy {
    pub const fn new(max_attempts: u32, initial_delay: Duration, multiplier: f64) -> Self {
        Self {
            max_attempts,
            initial_delay,
            multiplier,
        }
    }

    /// Delay applied after the given failed attempt (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt.saturating_sub(1) as i32);
        self.initial_delay.mul_f64(factor)
    }

    /// Run `op` until it succeeds, the error is not retryable, or the attempt
    /// budget is exhausted. The last error is returned on exhaustion.
    pub async fn run<T, E, F, Fut>(&self, retryable: impl Fn(&E) -> bool, mut op: F) -> Result<T, E>
    where
        E: std::fmt::Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let attempts = self.max_attempts.max(1);
        for attempt in 1..=attempts {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if attempt == attempts || !retryable(&err) {
                        return Err(err);
                    }
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        attempt,
                        max_attempts = attempts,
                        delay_ms = delay.as_millis() as u64,
                        "retryable failure: {}",
                        err
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
        unreachable!("retry loop returns inside the final attempt")
    }
}
