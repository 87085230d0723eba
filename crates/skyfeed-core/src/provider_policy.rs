use std::time::Duration;

use crate::ProviderId;

/// Per-provider request budget and throttle-retry behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderPolicy {
    pub provider_id: ProviderId,
    pub quota_window: Duration,
    pub quota_limit: u32,
    pub retry_backoff: BackoffPolicy,
}

/// Backoff applied while waiting for rate budget to free up.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    pub max_retries: u32,
}

impl ProviderPolicy {
    /// OpenWeatherMap free tier: 60 calls per minute.
    pub fn openweather_default() -> Self {
        Self {
            provider_id: ProviderId::Openweather,
            quota_window: Duration::from_secs(60),
            quota_limit: 60,
            retry_backoff: BackoffPolicy {
                initial_delay: Duration::from_secs(1),
                max_delay: Duration::from_secs(30),
                multiplier: 2.0,
                max_retries: 3,
            },
        }
    }

    pub fn weatherapi_default() -> Self {
        Self {
            provider_id: ProviderId::Weatherapi,
            quota_window: Duration::from_secs(60),
            quota_limit: 90,
            retry_backoff: BackoffPolicy {
                initial_delay: Duration::from_millis(500),
                max_delay: Duration::from_secs(30),
                multiplier: 2.0,
                max_retries: 3,
            },
        }
    }

    /// AccuWeather's free tier is 50 calls per day; a tight per-minute
    /// budget keeps a misconfigured schedule from draining it in one tick.
    pub fn accuweather_default() -> Self {
        Self {
            provider_id: ProviderId::Accuweather,
            quota_window: Duration::from_secs(60),
            quota_limit: 12,
            retry_backoff: BackoffPolicy {
                initial_delay: Duration::from_secs(2),
                max_delay: Duration::from_secs(60),
                multiplier: 2.0,
                max_retries: 3,
            },
        }
    }

    /// api.weather.gov has no published quota; stay polite.
    pub fn noaa_default() -> Self {
        Self {
            provider_id: ProviderId::Noaa,
            quota_window: Duration::from_secs(60),
            quota_limit: 30,
            retry_backoff: BackoffPolicy {
                initial_delay: Duration::from_secs(1),
                max_delay: Duration::from_secs(30),
                multiplier: 2.0,
                max_retries: 3,
            },
        }
    }

    pub fn default_for(provider_id: ProviderId) -> Self {
        match provider_id {
            ProviderId::Openweather => Self::openweather_default(),
            ProviderId::Weatherapi => Self::weatherapi_default(),
            ProviderId::Accuweather => Self::accuweather_default(),
            ProviderId::Noaa => Self::noaa_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_provider_has_a_default_policy() {
        for provider in ProviderId::ALL {
            let policy = ProviderPolicy::default_for(provider);
            assert_eq!(policy.provider_id, provider);
            assert!(policy.quota_limit > 0);
        }
    }

    #[test]
    fn openweather_policy_matches_free_tier() {
        let policy = ProviderPolicy::openweather_default();
        assert_eq!(policy.quota_window, Duration::from_secs(60));
        assert_eq!(policy.quota_limit, 60);
    }
}
