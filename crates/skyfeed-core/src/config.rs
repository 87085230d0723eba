//! Runtime configuration: API credentials from the environment and the
//! JSON application config carrying tuning knobs plus the job list.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::adapters::{AccuWeatherAdapter, NoaaAdapter, OpenWeatherAdapter, WeatherApiAdapter};
use crate::quality::QualityConfig;
use crate::registry::AdapterRegistry;
use crate::retry::RetryConfig;
use crate::scheduler::{CollectionJob, SchedulerConfig};
use crate::{CoreError, DataType, Location, ProviderId};

pub const OPENWEATHER_KEY_VAR: &str = "SKYFEED_OPENWEATHER_API_KEY";
pub const WEATHERAPI_KEY_VAR: &str = "SKYFEED_WEATHERAPI_API_KEY";
pub const ACCUWEATHER_KEY_VAR: &str = "SKYFEED_ACCUWEATHER_API_KEY";

/// Provider API keys. Absent keys are not an error here; a fetch against
/// a keyless provider fails with a structured credentials error instead.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub openweather: Option<String>,
    pub weatherapi: Option<String>,
    pub accuweather: Option<String>,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self {
            openweather: read_env(OPENWEATHER_KEY_VAR),
            weatherapi: read_env(WEATHERAPI_KEY_VAR),
            accuweather: read_env(ACCUWEATHER_KEY_VAR),
        }
    }

    pub fn api_key(&self, provider: ProviderId) -> Option<&str> {
        match provider {
            ProviderId::Openweather => self.openweather.as_deref(),
            ProviderId::Weatherapi => self.weatherapi.as_deref(),
            ProviderId::Accuweather => self.accuweather.as_deref(),
            ProviderId::Noaa => None,
        }
    }
}

fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Registry with every built-in adapter wired to its credential.
pub fn build_default_registry(credentials: &Credentials) -> AdapterRegistry {
    for provider in ProviderId::ALL {
        if provider.requires_api_key() && credentials.api_key(provider).is_none() {
            tracing::warn!(
                source = %provider,
                "no API key configured; fetches against this source will fail"
            );
        }
    }

    let mut registry = AdapterRegistry::new();
    registry.register(Arc::new(OpenWeatherAdapter::new(
        credentials.openweather.clone(),
    )));
    registry.register(Arc::new(WeatherApiAdapter::new(
        credentials.weatherapi.clone(),
    )));
    registry.register(Arc::new(AccuWeatherAdapter::new(
        credentials.accuweather.clone(),
    )));
    registry.register(Arc::new(NoaaAdapter::new()));
    registry
}

/// One job entry as written in the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobEntry {
    pub name: String,
    pub source: String,
    pub lat: f64,
    pub lon: f64,
    pub data_type: String,
    pub frequency_minutes: u64,
}

/// Application configuration. Every knob has a default, so an empty JSON
/// object (or a missing file) yields a usable config with no jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Cache TTL in seconds; 0 disables caching.
    pub cache_ttl_secs: u64,
    pub retry_max_attempts: u32,
    pub quality_threshold: f64,
    pub max_observation_age_secs: u64,
    pub max_concurrent_jobs: usize,
    pub job_timeout_secs: u64,
    pub failure_recheck_secs: u64,
    pub tick_interval_secs: u64,
    pub jobs: Vec<JobEntry>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 300,
            retry_max_attempts: 3,
            quality_threshold: 0.70,
            max_observation_age_secs: 2 * 60 * 60,
            max_concurrent_jobs: 4,
            job_timeout_secs: 30,
            failure_recheck_secs: 60,
            tick_interval_secs: 1,
            jobs: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let body = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Parse and validate the configured jobs.
    pub fn collection_jobs(&self) -> Result<Vec<CollectionJob>, CoreError> {
        self.jobs
            .iter()
            .map(|entry| {
                let source: ProviderId = entry.source.parse()?;
                let data_type: DataType = entry.data_type.parse()?;
                let location = Location::new(entry.lat, entry.lon)?;
                Ok(CollectionJob::new(
                    entry.name.clone(),
                    source,
                    location,
                    data_type,
                    entry.frequency_minutes,
                )?)
            })
            .collect()
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.retry_max_attempts,
            ..RetryConfig::default()
        }
    }

    pub fn quality_config(&self) -> QualityConfig {
        QualityConfig {
            threshold: self.quality_threshold,
            max_observation_age: Duration::from_secs(self.max_observation_age_secs),
            ..QualityConfig::default()
        }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            max_concurrent_jobs: self.max_concurrent_jobs,
            job_timeout: Duration::from_secs(self.job_timeout_secs),
            failure_recheck: Duration::from_secs(self.failure_recheck_secs),
            tick_interval: Duration::from_secs(self.tick_interval_secs.max(1)),
        }
    }
}
