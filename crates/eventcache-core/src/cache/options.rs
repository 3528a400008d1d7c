use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::api::ApiError;

use super::QueryKey;

/// Number of times a failed read is retried before giving up.
const DEFAULT_MAX_RETRIES: u32 = 3;

/// First retry delay. Doubles on every further attempt.
const DEFAULT_BASE_DELAY_MS: u64 = 1000;

/// Upper bound for a single retry delay.
const DEFAULT_MAX_DELAY_MS: u64 = 30_000;

/// Bounded exponential backoff for reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Delay before retry number `attempt` (zero-based), with up to 25% jitter.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        let delay = self.base_delay.saturating_mul(factor).min(self.max_delay);
        let jitter_ms = (delay.as_millis() / 4) as u64;
        if jitter_ms == 0 {
            return delay;
        }
        delay + Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
    }

    /// Run `fetcher`, retrying retryable failures with backoff.
    pub(crate) async fn run<V, F, Fut>(&self, key: &QueryKey, fetcher: &F) -> Result<V, ApiError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<V, ApiError>>,
    {
        let mut attempt = 0;
        loop {
            match fetcher().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.max_retries => {
                    let delay = self.delay_for(attempt);
                    attempt += 1;
                    warn!(
                        key = %key,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Fetch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Per-read options: how long a value stays fresh and how reads are retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    pub stale_time: Duration,
    pub retry: RetryPolicy,
}

impl QueryOptions {
    pub fn new(stale_time: Duration) -> Self {
        Self {
            stale_time,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl Default for QueryOptions {
    /// Zero stale time: every read goes to the network unless a fetch is
    /// already in flight.
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = RetryPolicy {
            max_retries: 10,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(5000),
        };
        let first = policy.delay_for(0);
        assert!(first >= Duration::from_millis(1000) && first <= Duration::from_millis(1250));
        let second = policy.delay_for(1);
        assert!(second >= Duration::from_millis(2000) && second <= Duration::from_millis(2500));
        let capped = policy.delay_for(8);
        assert!(capped >= Duration::from_millis(5000) && capped <= Duration::from_millis(6250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_retries_transient_errors() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::default().with_base_delay(Duration::from_millis(10));
        let key = QueryKey::events();

        let result = policy
            .run(&key, &|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(ApiError::Network("connection reset".into()))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::default()
            .with_max_retries(2)
            .with_base_delay(Duration::from_millis(10));

        let result: Result<(), ApiError> = policy
            .run(&QueryKey::events(), &|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ApiError::Server { status: 502, message: None }) }
            })
            .await;

        assert!(matches!(result, Err(ApiError::Server { status: 502, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_run_does_not_retry_not_found() {
        let calls = AtomicU32::new(0);
        let result: Result<(), ApiError> = RetryPolicy::default()
            .run(&QueryKey::events(), &|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ApiError::NotFound("gone".into())) }
            })
            .await;

        assert!(result.unwrap_err().is_not_found());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
