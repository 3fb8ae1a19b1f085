//! Bounded fixed-delay retry.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use super::notifier::DeliveryError;
use crate::config::RelayConfig;

/// Retry budget for one notification.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    /// Decides whether a failed attempt is worth repeating
    pub retryable: fn(&DeliveryError) -> bool,
}

/// Last error once the budget is spent or a failure is not retryable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryExhausted {
    pub attempts: u32,
    pub last: DeliveryError,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            retryable: DeliveryError::is_retryable,
        }
    }

    pub fn from_config(config: &RelayConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.retry_delay_ms),
        )
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or
    /// `max_attempts` is reached. `op` receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, RetryExhausted>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, DeliveryError>>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    let retryable = (self.retryable)(&e);
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        retryable,
                        error = %e,
                        "Notification attempt failed"
                    );
                    if !retryable || attempt >= self.max_attempts {
                        return Err(RetryExhausted { attempts: attempt, last: e });
                    }
                }
            }
            tokio::time::sleep(self.delay).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = fast(5)
            .run(|attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 3 {
                        Err(DeliveryError::Status(503))
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;
        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausts_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast(5)
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(DeliveryError::Transport("refused".into())) }
            })
            .await;
        assert_eq!(
            result,
            Err(RetryExhausted {
                attempts: 5,
                last: DeliveryError::Transport("refused".into())
            })
        );
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_non_retryable_stops_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast(5)
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(DeliveryError::InvalidTarget("no host".into())) }
            })
            .await;
        assert_eq!(result.unwrap_err().attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_custom_classifier() {
        let mut policy = fast(4);
        policy.retryable = |e| !matches!(e, DeliveryError::Rejected { .. });
        let result: Result<(), _> = policy
            .run(|_| async {
                Err(DeliveryError::Rejected {
                    code: 1,
                    error: "no".into(),
                })
            })
            .await;
        assert_eq!(result.unwrap_err().attempts, 1);
    }

    #[test]
    fn test_zero_attempts_clamped() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }
}
