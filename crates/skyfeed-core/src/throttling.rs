use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

use crate::provider_policy::{BackoffPolicy, ProviderPolicy};
use crate::SourceError;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// In-memory rate gate for one provider's outbound calls.
///
/// When the quota is spent, callers wait out a bounded exponential backoff
/// instead of hammering the provider; exhaustion surfaces as `RateLimited`.
#[derive(Clone)]
pub struct ThrottlingQueue {
    limiter: Arc<DirectRateLimiter>,
    retry_backoff: BackoffPolicy,
}

impl ThrottlingQueue {
    pub fn new(quota_window: Duration, quota_limit: u32, retry_backoff: BackoffPolicy) -> Self {
        let quota = quota_from_window(quota_window, quota_limit);
        Self {
            limiter: Arc::new(RateLimiter::direct(quota)),
            retry_backoff,
        }
    }

    pub fn from_policy(policy: &ProviderPolicy) -> Self {
        Self::new(
            policy.quota_window,
            policy.quota_limit,
            policy.retry_backoff.clone(),
        )
    }

    /// Try to take one cell of rate budget without waiting.
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }

    /// Backoff delay for the given acquisition retry; `None` once the
    /// retry budget is spent.
    pub fn retry_delay(&self, retry_count: u32) -> Option<Duration> {
        if retry_count > self.retry_backoff.max_retries {
            return None;
        }

        let scale = self.retry_backoff.multiplier.powf(f64::from(retry_count));
        let seconds = self.retry_backoff.initial_delay.as_secs_f64() * scale;
        let capped_seconds = seconds.min(self.retry_backoff.max_delay.as_secs_f64());
        Some(Duration::from_secs_f64(capped_seconds))
    }

    /// Acquire rate budget, sleeping through the backoff schedule when the
    /// quota is spent. Only the calling task is suspended.
    pub async fn acquire(&self) -> Result<(), SourceError> {
        let mut retry_count = 0_u32;
        loop {
            if self.try_acquire() {
                return Ok(());
            }

            match self.retry_delay(retry_count) {
                Some(delay) => {
                    tokio::time::sleep(delay).await;
                    retry_count += 1;
                }
                None => {
                    return Err(SourceError::rate_limited(
                        "local rate budget exhausted after bounded waiting",
                    ));
                }
            }
        }
    }
}

fn quota_from_window(quota_window: Duration, quota_limit: u32) -> Quota {
    let safe_limit = quota_limit.max(1);
    let burst = NonZeroU32::new(safe_limit).expect("safe limit must be non-zero");

    let seconds_per_cell = (quota_window.as_secs_f64() / f64::from(safe_limit)).max(0.001);
    let period = Duration::from_secs_f64(seconds_per_cell);

    Quota::with_period(period)
        .expect("period is always greater than zero")
        .allow_burst(burst)
}
