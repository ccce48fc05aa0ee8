//! Retry policy and executor

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::backoff::BackoffCalculator;
use crate::error::{Classified, ResilienceError};

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Delay before the first retry
    #[serde(with = "humantime_serde")]
    pub initial_delay: Duration,

    /// Total number of attempts, including the first call
    pub max_attempts: u32,

    /// Factor applied to the delay after every retry
    pub backoff_multiplier: f64,

    /// Upper bound for a single delay
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub max_delay: Option<Duration>,

    /// Whether to add ±20% jitter to retry delays
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            max_attempts: 3,
            backoff_multiplier: 2.0,
            max_delay: None,
            jitter: false,
        }
    }
}

impl RetryPolicy {
    pub fn new(initial_delay: Duration, max_attempts: u32, backoff_multiplier: f64) -> Self {
        Self {
            initial_delay,
            max_attempts,
            backoff_multiplier,
            ..Self::default()
        }
    }

    /// Policy that never retries
    pub fn no_retry() -> Self {
        Self::new(Duration::ZERO, 1, 1.0)
    }

    /// Calculate the delay that follows failed attempt `attempt` (1-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.calculator().calculate_delay(attempt)
    }

    fn calculator(&self) -> BackoffCalculator {
        BackoffCalculator::new(
            self.initial_delay,
            self.backoff_multiplier,
            self.max_delay,
            self.jitter,
        )
    }
}

/// Successful result together with the number of retries it took
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retried<T> {
    pub value: T,
    /// Failed attempts before the successful one
    pub retries: u32,
}

/// Retry executor
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    /// Create a new retry executor with the given policy
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Create with default policy
    pub fn with_default_policy() -> Self {
        Self::new(RetryPolicy::default())
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `operation` until it succeeds, fails permanently or runs out of attempts.
    ///
    /// Only transient failures are retried. The wait between attempts suspends
    /// this task alone and holds no locks.
    pub async fn execute<F, Fut, T, E>(
        &self,
        service_name: &str,
        mut operation: F,
    ) -> Result<Retried<T>, ResilienceError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classified + Display,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let calculator = self.policy.calculator();
        let mut attempt: u32 = 0;

        loop {
            debug!(service = %service_name, attempt = attempt + 1, max_attempts, "executing attempt");

            match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        info!(service = %service_name, retries = attempt, "succeeded after retries");
                    }
                    return Ok(Retried {
                        value,
                        retries: attempt,
                    });
                }
                Err(error) if !error.is_retryable() => {
                    warn!(service = %service_name, %error, "permanent error, not retrying");
                    return Err(ResilienceError::Permanent(error));
                }
                Err(error) => {
                    attempt += 1;
                    if attempt >= max_attempts {
                        warn!(service = %service_name, attempts = attempt, %error, "max retries exceeded");
                        return Err(ResilienceError::RetriesExhausted {
                            attempts: attempt,
                            last_error: error,
                        });
                    }

                    let delay = calculator.calculate_delay(attempt);
                    warn!(
                        service = %service_name,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        %error,
                        "transient error, retrying"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FailureKind, ServiceError};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    fn fails_then_succeeds(
        failures: u32,
        kind: FailureKind,
        counter: Arc<AtomicU32>,
    ) -> impl FnMut() -> std::future::Ready<Result<&'static str, ServiceError>> {
        move || {
            let call = counter.fetch_add(1, Ordering::SeqCst) + 1;
            std::future::ready(if call <= failures {
                Err(ServiceError::new("test", kind, format!("call {call} failed")))
            } else {
                Ok("done")
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_success_after_failures() {
        let counter = Arc::new(AtomicU32::new(0));
        let executor = RetryExecutor::new(RetryPolicy::new(Duration::from_secs(1), 3, 2.0));

        let started = Instant::now();
        let result = executor
            .execute(
                "test",
                fails_then_succeeds(2, FailureKind::ServiceUnavailable, counter.clone()),
            )
            .await
            .unwrap();

        assert_eq!(result.value, "done");
        assert_eq!(result.retries, 2);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        // 1s + 2s of backoff
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_exhausted() {
        let counter = Arc::new(AtomicU32::new(0));
        let executor = RetryExecutor::new(RetryPolicy::new(Duration::from_secs(1), 3, 2.0));

        let err = executor
            .execute(
                "test",
                fails_then_succeeds(u32::MAX, FailureKind::Timeout, counter.clone()),
            )
            .await
            .unwrap_err();

        match err {
            ResilienceError::RetriesExhausted {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 3);
                assert_eq!(last_error.kind, FailureKind::Timeout);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_is_not_retried() {
        let counter = Arc::new(AtomicU32::new(0));
        let executor = RetryExecutor::new(RetryPolicy::new(Duration::from_secs(5), 5, 2.0));

        let started = Instant::now();
        let err = executor
            .execute(
                "test",
                fails_then_succeeds(1, FailureKind::AuthenticationFailure, counter.clone()),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ResilienceError::Permanent(ServiceError {
                kind: FailureKind::AuthenticationFailure,
                ..
            })
        ));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_attempt_never_retries() {
        let counter = Arc::new(AtomicU32::new(0));
        let executor = RetryExecutor::new(RetryPolicy::new(Duration::from_secs(1), 1, 2.0));

        let started = Instant::now();
        let err = executor
            .execute(
                "test",
                fails_then_succeeds(1, FailureKind::NetworkError, counter.clone()),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ResilienceError::RetriesExhausted { attempts: 1, .. }
        ));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_attempts_behaves_like_one() {
        let counter = Arc::new(AtomicU32::new(0));
        let executor = RetryExecutor::new(RetryPolicy::new(Duration::from_secs(1), 0, 2.0));

        let result = executor
            .execute(
                "test",
                fails_then_succeeds(0, FailureKind::NetworkError, counter.clone()),
            )
            .await
            .unwrap();
        assert_eq!(result.retries, 0);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_policy_delays() {
        let policy = RetryPolicy::new(Duration::from_secs(1), 4, 2.0);
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(4));
    }
}
