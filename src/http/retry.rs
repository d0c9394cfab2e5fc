//! Retry loop with exponential backoff.
//!
//! Both facades run the same state machine: attempt, then either finish,
//! fail, or back off and attempt again. Only errors for which
//! [`SerpshotError::is_retryable`] holds are retried, and never more than
//! [`RetryPolicy::max_retries`] times.

use async_trait::async_trait;
use log::{debug, warn};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, SerpshotError};

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Delay before the first retry; doubled for each further retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Upper bound for a single backoff delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// How transient failures are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt. `0` disables retrying.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Spread each delay uniformly over 50%..150% (still capped at `max_delay`).
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            jitter: false,
        }
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Retry(Duration),
    Fail,
}

impl RetryPolicy {
    /// Un-jittered delay before retry number `retry_index` (0-based):
    /// `base_delay * 2^retry_index`, capped at `max_delay`.
    pub fn delay_for(&self, retry_index: u32) -> Duration {
        2u32.checked_pow(retry_index)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    fn backoff(&self, retry_index: u32) -> Duration {
        let delay = self.delay_for(retry_index);
        if self.jitter {
            let factor = 0.5 + fastrand::f64();
            Duration::try_from_secs_f64(delay.as_secs_f64() * factor)
                .unwrap_or(self.max_delay)
                .min(self.max_delay)
        } else {
            delay
        }
    }

    fn next_step(&self, retries_so_far: u32, error: &SerpshotError) -> Step {
        if !error.is_retryable() || retries_so_far >= self.max_retries {
            Step::Fail
        } else {
            Step::Retry(self.backoff(retries_so_far))
        }
    }
}

/// Backoff suspension.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Yields to the runtime for `delay`.
    async fn sleep(&self, delay: Duration);

    /// Blocks the calling thread for `delay`.
    fn sleep_blocking(&self, delay: Duration);
}

/// Sleeps on the tokio timer or the OS thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemSleeper;

#[async_trait]
impl Sleeper for SystemSleeper {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }

    fn sleep_blocking(&self, delay: Duration) {
        std::thread::sleep(delay);
    }
}

/// Runs `operation` until it succeeds, fails terminally, runs out of
/// retries, or `cancel` fires.
///
/// Cancellation is honoured before each attempt, while an attempt is in
/// flight and while backing off; a cancelled call returns
/// [`SerpshotError::Cancelled`] and is never retried.
pub async fn with_retry<F, Fut, T>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    cancel: &CancellationToken,
    operation_name: &str,
    operation: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut retries = 0;

    loop {
        if cancel.is_cancelled() {
            debug!("{}: cancelled before attempt {}", operation_name, retries + 1);
            return Err(SerpshotError::Cancelled);
        }

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("{}: cancelled during attempt {}", operation_name, retries + 1);
                return Err(SerpshotError::Cancelled);
            }
            outcome = operation() => outcome,
        };

        let error = match outcome {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        match policy.next_step(retries, &error) {
            Step::Fail => {
                debug!(
                    "{}: giving up after {} attempt(s): {}",
                    operation_name,
                    retries + 1,
                    error
                );
                return Err(error);
            }
            Step::Retry(delay) => {
                warn!(
                    "{}: attempt {}/{} failed ({}), retrying in {}ms...",
                    operation_name,
                    retries + 1,
                    policy.max_retries + 1,
                    error,
                    delay.as_millis()
                );
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        debug!("{}: cancelled during backoff", operation_name);
                        return Err(SerpshotError::Cancelled);
                    }
                    _ = sleeper.sleep(delay) => {}
                }
                retries += 1;
            }
        }
    }
}

/// Blocking counterpart of [`with_retry`]. No cancellation; each attempt is
/// bounded by the transport timeout only.
pub fn with_retry_blocking<F, T>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    operation_name: &str,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let mut retries = 0;

    loop {
        let error = match operation() {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        match policy.next_step(retries, &error) {
            Step::Fail => {
                debug!(
                    "{}: giving up after {} attempt(s): {}",
                    operation_name,
                    retries + 1,
                    error
                );
                return Err(error);
            }
            Step::Retry(delay) => {
                warn!(
                    "{}: attempt {}/{} failed ({}), retrying in {}ms...",
                    operation_name,
                    retries + 1,
                    policy.max_retries + 1,
                    error,
                    delay.as_millis()
                );
                sleeper.sleep_blocking(delay);
                retries += 1;
            }
        }
    }
}
