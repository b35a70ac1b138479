//! Bounded retry for ledger units of work
//!
//! Each attempt runs under the mutation timeout. A timed-out attempt is
//! dropped (its transaction rolls back) and is not retried.

use super::LedgerError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Base delay before the first retry
const RETRY_BASE_DELAY_MS: u64 = 10;
/// Cap for a single back-off delay
const RETRY_MAX_DELAY_MS: u64 = 200;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Upper bound for one attempt
    pub timeout: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, timeout: Duration) -> Self {
        Self {
            max_retries,
            timeout,
        }
    }

    /// Exponential back-off with jitter so contending writers spread out
    fn delay(retry_count: u32) -> Duration {
        let base = (RETRY_BASE_DELAY_MS * 2_u64.pow(retry_count.saturating_sub(1).min(8)))
            .min(RETRY_MAX_DELAY_MS);
        let jitter = rand::thread_rng().gen_range(0..=base);
        Duration::from_millis(base / 2 + jitter)
    }

    /// Run `op` until it succeeds, fails permanently or retries run out
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, LedgerError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LedgerError>>,
    {
        let mut retry_count = 0;
        loop {
            let result = match tokio::time::timeout(self.timeout, op()).await {
                Ok(result) => result,
                Err(_) => {
                    let timeout_ms = self.timeout.as_millis() as u64;
                    tracing::warn!(operation, timeout_ms, "Ledger operation timed out");
                    return Err(LedgerError::Timeout(timeout_ms));
                }
            };

            match result {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && retry_count < self.max_retries => {
                    retry_count += 1;
                    let delay = Self::delay(retry_count);
                    tracing::warn!(
                        operation,
                        retry_count,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying ledger operation"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    if e.is_retryable() {
                        tracing::error!(
                            operation,
                            retry_count,
                            error = %e,
                            "Ledger operation failed, max retries exceeded"
                        );
                    }
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_retries_concurrent_modification_then_succeeds() {
        let policy = RetryPolicy::new(3, Duration::from_secs(1));
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();
        let result = policy
            .run("test", || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(LedgerError::ConcurrentModification("busy".into()))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let policy = RetryPolicy::new(2, Duration::from_secs(1));
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();
        let result: Result<(), _> = policy
            .run("test", || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(LedgerError::ConcurrentModification("busy".into()))
                }
            })
            .await;
        assert!(matches!(result, Err(LedgerError::ConcurrentModification(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_does_not_retry_business_errors() {
        let policy = RetryPolicy::new(3, Duration::from_secs(1));
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();
        let result: Result<(), _> = policy
            .run("test", || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(LedgerError::EmptyOrder)
                }
            })
            .await;
        assert!(matches!(result, Err(LedgerError::EmptyOrder)));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout() {
        let policy = RetryPolicy::new(3, Duration::from_millis(20));
        let result: Result<(), _> = policy
            .run("test", || async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(LedgerError::Timeout(20))));
    }
}
