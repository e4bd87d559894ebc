use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use shared_config::AppConfig;

/// Errors the retry loop can classify.
pub trait RetryableError: Display {
    /// Infrastructure failures (timeouts, network, cold start) that are safe to retry.
    fn is_transient(&self) -> bool;

    /// The error reported when an attempt exceeds its time limit.
    fn timed_out(limit: Duration) -> Self;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    Terminal,
    Exhausted,
}

/// What to do after a failed attempt with `remaining` retries left.
pub fn decide<E: RetryableError>(error: &E, remaining: u32) -> RetryDecision {
    if !error.is_transient() {
        RetryDecision::Terminal
    } else if remaining == 0 {
        RetryDecision::Exhausted
    } else {
        RetryDecision::Retry
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub backoff_multiplier: f64,
    /// A hibernated backend needs longer to answer the first request.
    pub first_attempt_timeout: Duration,
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(2000),
            backoff_multiplier: 1.5,
            first_attempt_timeout: Duration::from_secs(45),
            attempt_timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
            ..Self::default()
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.retry_max_retries,
            Duration::from_millis(config.retry_initial_delay_ms),
        )
    }

    pub fn timeout_for_attempt(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            self.first_attempt_timeout
        } else {
            self.attempt_timeout
        }
    }

    pub fn next_delay(&self, delay: Duration) -> Duration {
        delay.mul_f64(self.backoff_multiplier)
    }

    /// Runs `operation` until it succeeds, fails terminally, or the retry
    /// budget is spent. Each attempt is raced against its timeout.
    pub async fn execute<T, E, F, Fut>(&self, mut operation: F) -> Result<T, E>
    where
        E: RetryableError,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt: u32 = 1;
        let mut remaining = self.max_retries;
        let mut delay = self.initial_delay;

        loop {
            let limit = self.timeout_for_attempt(attempt);
            let outcome = match timeout(limit, operation()).await {
                Ok(result) => result,
                Err(_) => Err(E::timed_out(limit)),
            };

            let err = match outcome {
                Ok(value) => {
                    if attempt > 1 {
                        info!(attempt, "Backend call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            match decide(&err, remaining) {
                RetryDecision::Retry => {
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Attempt {} failed: {}. Retrying in {:?}",
                        attempt,
                        err,
                        delay
                    );
                    sleep(delay).await;
                    remaining -= 1;
                    delay = self.next_delay(delay);
                    attempt += 1;
                }
                RetryDecision::Terminal => {
                    debug!(attempt, "Terminal backend error, not retrying: {}", err);
                    return Err(err);
                }
                RetryDecision::Exhausted => {
                    error!(attempts = attempt, "Final failure after {} attempts: {}", attempt, err);
                    return Err(err);
                }
            }
        }
    }
}

/// [`RetryPolicy::execute`] with the default policy.
pub async fn with_retry<T, E, F, Fut>(operation: F) -> Result<T, E>
where
    E: RetryableError,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    RetryPolicy::default().execute(operation).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[derive(Debug, Clone, PartialEq)]
    enum TestError {
        Timeout(Duration),
        Network,
        InvalidLogin,
    }

    impl Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    impl RetryableError for TestError {
        fn is_transient(&self) -> bool {
            matches!(self, TestError::Timeout(_) | TestError::Network)
        }

        fn timed_out(limit: Duration) -> Self {
            TestError::Timeout(limit)
        }
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.initial_delay, Duration::from_millis(2000));
        assert_eq!(policy.timeout_for_attempt(1), Duration::from_secs(45));
        assert_eq!(policy.timeout_for_attempt(2), Duration::from_secs(30));
        assert_eq!(policy.timeout_for_attempt(4), Duration::from_secs(30));
    }

    #[test]
    fn test_next_delay_grows_by_half() {
        let policy = RetryPolicy::default();
        let second = policy.next_delay(policy.initial_delay);
        assert_eq!(second, Duration::from_millis(3000));
        assert_eq!(policy.next_delay(second), Duration::from_millis(4500));
    }

    #[test]
    fn test_decide() {
        assert_eq!(decide(&TestError::Network, 2), RetryDecision::Retry);
        assert_eq!(decide(&TestError::Timeout(Duration::from_secs(1)), 1), RetryDecision::Retry);
        assert_eq!(decide(&TestError::Network, 0), RetryDecision::Exhausted);
        assert_eq!(decide(&TestError::InvalidLogin, 3), RetryDecision::Terminal);
        assert_eq!(decide(&TestError::InvalidLogin, 0), RetryDecision::Terminal);
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_third_attempt_after_timeouts() {
        let calls = AtomicU32::new(0);
        let started = Instant::now();

        let result = RetryPolicy::default()
            .execute(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n < 3 {
                        sleep(Duration::from_secs(120)).await;
                    }
                    Ok::<u32, TestError>(n)
                }
            })
            .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 45s first timeout + 2s delay + 30s timeout + 3s delay
        assert!(started.elapsed() >= Duration::from_secs(80));
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_error_short_circuits() {
        let calls = AtomicU32::new(0);

        let result = RetryPolicy::default()
            .execute(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<u32, TestError>(TestError::InvalidLogin) }
            })
            .await;

        assert_eq!(result, Err(TestError::InvalidLogin));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_propagates_timeout() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(2, Duration::from_millis(2000));

        let result = policy
            .execute(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    sleep(Duration::from_secs(600)).await;
                    Ok::<u32, TestError>(0)
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(result, Err(TestError::Timeout(Duration::from_secs(30))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_delays_accumulate() {
        let calls = AtomicU32::new(0);
        let started = Instant::now();

        let result = RetryPolicy::default()
            .execute(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<u32, TestError>(TestError::Network) }
            })
            .await;

        assert_eq!(result, Err(TestError::Network));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        // 2s + 3s + 4.5s
        assert!(started.elapsed() >= Duration::from_millis(9500));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_retries_runs_once() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(0, Duration::from_millis(10));

        let result = policy
            .execute(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<u32, TestError>(TestError::Network) }
            })
            .await;

        assert_eq!(result, Err(TestError::Network));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_uses_default_policy() {
        let calls = AtomicU32::new(0);

        let result = with_retry(|| {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n == 1 {
                    Err(TestError::Network)
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(2));
    }
}
