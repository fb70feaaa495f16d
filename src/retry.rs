//! Bounded retry with exponential backoff for remote calls.
//!
//! Errors are split in two by the [`Transient`] trait. Transient errors
//! (timeouts, connection failures) are retried after a growing delay; every
//! other error ends the call at once. In both failure cases the caller gets
//! `None` and the error itself stays in the logs.
//!
//! # Backoff Strategy
//!
//! After failed attempt `n` (counting from zero) the wrapper sleeps
//! ```text
//! delay = base_delay * 2^n + random_jitter(0..=max_jitter)
//! ```
//! No sleep follows the final attempt.

use rand::{Rng, rng};
use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Classifies an error as worth retrying.
pub trait Transient {
    /// `true` for timeouts and connection-level failures.
    fn is_transient(&self) -> bool;
}

/// How many times to try and how long to wait between tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Delay after the first failed attempt, doubled after each further one.
    pub base_delay: Duration,
    /// Upper bound of the random jitter added to every delay.
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_jitter: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    /// Policy with the given attempt budget and a one second base delay.
    pub fn with_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Same policy without jitter, useful when timings must be exact.
    pub fn without_jitter(self) -> Self {
        Self {
            max_jitter: Duration::ZERO,
            ..self
        }
    }

    /// Delay to observe after the zero-based failed `attempt`, jitter excluded.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX))
    }

    fn jitter(&self) -> Duration {
        let max_ms = self.max_jitter.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rng().random_range(0..=max_ms))
    }

    /// Run `op` until it succeeds, fails with a non-transient error, or the
    /// attempt budget is spent.
    ///
    /// Returns `None` on any failure. Each attempt is independent: nothing
    /// from a failed attempt is carried into the result.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Transient + fmt::Display,
    {
        let total_t0 = Instant::now();
        let max = self.max_attempts.max(1);

        for attempt in 0..max {
            let attempt_t0 = Instant::now();
            match op().await {
                Ok(value) => {
                    if attempt > 0 {
                        info!(
                            label,
                            attempts = attempt + 1,
                            elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                            "Call succeeded after retrying"
                        );
                    }
                    return Some(value);
                }
                Err(e) if e.is_transient() => {
                    let elapsed_ms_attempt = attempt_t0.elapsed().as_millis() as u64;
                    if attempt + 1 >= max {
                        error!(
                            label,
                            attempt = attempt + 1,
                            max,
                            elapsed_ms_attempt,
                            elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                            error = %e,
                            "Call exhausted retries"
                        );
                        return None;
                    }
                    let delay = self.backoff(attempt) + self.jitter();
                    warn!(
                        label,
                        attempt = attempt + 1,
                        max,
                        elapsed_ms_attempt,
                        ?delay,
                        error = %e,
                        "Transient failure; backing off"
                    );
                    sleep(delay).await;
                }
                Err(e) => {
                    error!(
                        label,
                        attempt = attempt + 1,
                        error = %e,
                        "Non-retryable failure; giving up"
                    );
                    return None;
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Debug)]
    enum FakeError {
        Timeout,
        Fatal,
    }

    impl fmt::Display for FakeError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{self:?}")
        }
    }

    impl Transient for FakeError {
        fn is_transient(&self) -> bool {
            matches!(self, FakeError::Timeout)
        }
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(5),
            max_jitter: Duration::ZERO,
        }
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(0), Duration::from_secs(1));
        assert_eq!(policy.backoff(1), Duration::from_secs(2));
        assert_eq!(policy.backoff(2), Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let calls = Cell::new(0);
        let out = fast_policy(3)
            .run("ok", || {
                calls.set(calls.get() + 1);
                async { Ok::<_, FakeError>(7) }
            })
            .await;
        assert_eq!(out, Some(7));
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failure() {
        let calls = Cell::new(0);
        let out = fast_policy(3)
            .run("flaky", || {
                calls.set(calls.get() + 1);
                let n = calls.get();
                async move {
                    if n < 2 {
                        Err(FakeError::Timeout)
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;
        assert_eq!(out, Some("done"));
        assert_eq!(calls.get(), 2);
    }

    #[tokio::test]
    async fn test_non_transient_is_not_retried() {
        let calls = Cell::new(0);
        let out = fast_policy(5)
            .run("fatal", || {
                calls.set(calls.get() + 1);
                async { Err::<(), _>(FakeError::Fatal) }
            })
            .await;
        assert_eq!(out, None);
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_attempts_and_delay() {
        let calls = Cell::new(0);
        let policy = fast_policy(4);
        let t0 = Instant::now();
        let out = policy
            .run("always-timeout", || {
                calls.set(calls.get() + 1);
                async { Err::<(), _>(FakeError::Timeout) }
            })
            .await;
        assert_eq!(out, None);
        assert_eq!(calls.get(), 4);
        // 5ms * (1 + 2 + 4)
        assert!(t0.elapsed() >= Duration::from_millis(35));
    }
}
