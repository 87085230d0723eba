//! Retry with exponential backoff and jitter, driven by error classification.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::SourceError;

/// Backoff strategy between retry attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Fixed delay between retries.
    Fixed {
        delay: Duration,
    },
    /// Exponential delay: `base * (factor ^ attempt)`, capped at `max`,
    /// optionally jittered +/- 50%.
    Exponential {
        base: Duration,
        factor: f64,
        max: Duration,
        jitter: bool,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Exponential {
            base: Duration::from_millis(500),
            factor: 2.0,
            max: Duration::from_secs(30),
            jitter: true,
        }
    }
}

impl Backoff {
    /// Delay before retrying after the given 0-based failed attempt.
    pub fn delay(self, attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay } => delay,
            Self::Exponential {
                base,
                factor,
                max,
                jitter,
            } => {
                let scale = factor.powi(attempt as i32);
                let seconds = base.as_secs_f64() * scale;
                let capped_seconds = seconds.min(max.as_secs_f64());

                let mut delay = Duration::from_secs_f64(capped_seconds);

                if jitter {
                    let jitter_ms = (delay.as_millis() as f64 * 0.5) as u64;
                    let random_offset = fastrand::u64(0..=(jitter_ms * 2));
                    let total_ms =
                        delay.as_millis() as i64 + (random_offset as i64 - jitter_ms as i64);
                    delay = Duration::from_millis(total_ms.max(0) as u64);
                }

                delay
            }
        }
    }
}

/// Retry budget and backoff for one fetch pipeline.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total call budget, including the first attempt.
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::default(),
        }
    }
}

impl RetryConfig {
    pub fn fixed(delay: Duration, max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Fixed { delay },
        }
    }

    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }
}

/// Wraps adapter calls with bounded retry.
///
/// Transient errors are retried with backoff up to the configured budget;
/// fatal errors return immediately after exactly one call. Sleeping between
/// attempts suspends only the owning task.
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub async fn execute<T, F, Fut>(&self, mut op: F) -> Result<T, SourceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut last_error: Option<SourceError> = None;

        for attempt in 0..max_attempts {
            match op().await {
                Ok(value) => return Ok(value),
                Err(error) if !error.retryable() => return Err(error),
                Err(error) => {
                    let remaining = max_attempts - attempt - 1;
                    if remaining > 0 {
                        let delay = self.config.backoff.delay(attempt);
                        warn!(
                            attempt = attempt + 1,
                            remaining,
                            delay_ms = delay.as_millis() as u64,
                            error = %error,
                            "transient fetch failure, backing off before retry"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    last_error = Some(error);
                }
            }
        }

        let last = last_error.unwrap_or_else(|| SourceError::transport("no attempts were made"));
        Err(SourceError::retry_exhausted(max_attempts, &last))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::SourceErrorKind;

    #[test]
    fn fixed_backoff_is_constant() {
        let backoff = Backoff::Fixed {
            delay: Duration::from_millis(100),
        };

        assert_eq!(backoff.delay(0), Duration::from_millis(100));
        assert_eq!(backoff.delay(7), Duration::from_millis(100));
    }

    #[test]
    fn exponential_backoff_doubles_and_caps() {
        let backoff = Backoff::Exponential {
            base: Duration::from_millis(100),
            factor: 2.0,
            max: Duration::from_secs(1),
            jitter: false,
        };

        assert_eq!(backoff.delay(0), Duration::from_millis(100));
        assert_eq!(backoff.delay(1), Duration::from_millis(200));
        assert_eq!(backoff.delay(2), Duration::from_millis(400));
        assert_eq!(backoff.delay(3), Duration::from_millis(800));
        assert_eq!(backoff.delay(4), Duration::from_secs(1));
    }

    #[test]
    fn jittered_backoff_stays_within_half_band() {
        let backoff = Backoff::Exponential {
            base: Duration::from_millis(100),
            factor: 2.0,
            max: Duration::from_secs(1),
            jitter: true,
        };

        for _ in 0..10 {
            for attempt in 0..5 {
                let delay_ms = backoff.delay(attempt).as_millis() as f64;
                let expected = (100.0 * 2_f64.powi(attempt as i32)).min(1000.0);
                assert!(delay_ms >= expected * 0.49, "delay_ms={delay_ms}");
                assert!(delay_ms <= expected * 1.51, "delay_ms={delay_ms}");
            }
        }
    }

    #[tokio::test]
    async fn transient_failures_consume_the_whole_budget() {
        let executor = RetryExecutor::new(RetryConfig::fixed(Duration::from_millis(1), 3));
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = executor
            .execute(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(SourceError::transport("timeout")) }
            })
            .await;

        let error = result.expect_err("must exhaust");
        assert_eq!(error.kind(), SourceErrorKind::RetryExhausted);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn fatal_failure_makes_exactly_one_call() {
        let executor = RetryExecutor::new(RetryConfig::fixed(Duration::from_millis(1), 3));
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = executor
            .execute(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(SourceError::provider("malformed response")) }
            })
            .await;

        let error = result.expect_err("fatal error propagates");
        assert_eq!(error.kind(), SourceErrorKind::Provider);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn recovers_when_a_later_attempt_succeeds() {
        let executor = RetryExecutor::new(RetryConfig::fixed(Duration::from_millis(1), 3));
        let calls = AtomicU32::new(0);

        let result = executor
            .execute(|| {
                let attempt = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 2 {
                        Err(SourceError::transport("flaky"))
                    } else {
                        Ok(42_u32)
                    }
                }
            })
            .await;

        assert_eq!(result.expect("third attempt succeeds"), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
