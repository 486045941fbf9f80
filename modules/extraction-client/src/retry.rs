//! Bounded retry with linear backoff, independent of any HTTP client.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

/// Attempt budget and backoff base. The delay before attempt `n + 1` is
/// `base_delay * n`, so the default schedule sleeps 200ms then 400ms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Sleep taken after the given (1-based) failed attempt.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

/// Run `op` until `should_retry` rejects its result or the attempt budget
/// runs out. `op` receives the 1-based attempt number. After the last
/// attempt the final result is returned as-is, success or not.
pub async fn retry_with_backoff<T, E, Op, Fut, P>(
    policy: &RetryPolicy,
    mut op: Op,
    should_retry: P,
) -> Result<T, E>
where
    Op: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&Result<T, E>) -> bool,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        let result = op(attempt).await;
        if attempt >= max_attempts || !should_retry(&result) {
            return result;
        }

        let delay = policy.delay_after(attempt);
        debug!(attempt, delay_ms = delay.as_millis() as u64, "Transient failure, backing off");
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::ZERO)
    }

    #[test]
    fn default_schedule_is_linear() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay_after(1), Duration::from_millis(200));
        assert_eq!(policy.delay_after(2), Duration::from_millis(400));
    }

    #[test]
    fn zero_attempts_clamped_to_one() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }

    #[tokio::test]
    async fn stops_on_first_success() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = retry_with_backoff(
            &fast(3),
            |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Ok(attempt) }
            },
            |r| r.is_err(),
        )
        .await;

        assert_eq!(result, Ok(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn flaky_operation_recovers() {
        let calls = AtomicU32::new(0);
        let result: Result<&str, &str> = retry_with_backoff(
            &fast(3),
            |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 3 {
                        Err("flaky")
                    } else {
                        Ok("done")
                    }
                }
            },
            |r| r.is_err(),
        )
        .await;

        assert_eq!(result, Ok("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhaustion_returns_last_result() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = retry_with_backoff(
            &fast(3),
            |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(format!("failure {attempt}")) }
            },
            |r| r.is_err(),
        )
        .await;

        assert_eq!(result, Err("failure 3".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_result_returned_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<u16, ()> = retry_with_backoff(
            &fast(3),
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(404) }
            },
            |r| matches!(r, Ok(502..=504)),
        )
        .await;

        assert_eq!(result, Ok(404));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
