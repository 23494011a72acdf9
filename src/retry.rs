//! Bounded retry with exponential backoff.
//!
//! The cache, the staging uploader, and any other transient-failure path all
//! share this one primitive instead of carrying their own retry loops.

use std::future::Future;
use std::time::Duration;

/// Retry policy: a fixed attempt bound with a doubling delay schedule.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    max_attempts: u32,
    base_delay: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl Backoff {
    /// Create a policy with the given attempt bound and base delay.
    ///
    /// An attempt bound of zero is treated as one: every operation gets at
    /// least a single try.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Maximum number of attempts this policy permits.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay to sleep after a failed attempt (1-based).
    ///
    /// Follows the doubling schedule: base, 2x base, 4x base, ...
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// Run `op` until it succeeds or the attempt bound is exhausted.
    ///
    /// Every failure is treated as transient. The error from the final
    /// attempt is returned unchanged so callers keep the full failure detail.
    pub async fn run<T, E, F, Fut>(&self, what: &str, mut op: F) -> std::result::Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_attempts => {
                    let delay = self.delay_for(attempt);
                    log::warn!(
                        "{what}: attempt {attempt}/{} failed ({err}), retrying in {}s",
                        self.max_attempts,
                        delay.as_secs()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    log::error!("{what}: failed after {attempt} attempts: {err}");
                    return Err(err);
                }
            }
        }
    }
}
