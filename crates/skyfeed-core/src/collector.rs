//! Collection pipeline: cache consult, per-provider throttle, retried
//! fetch, quality validation, cache write, statistics.
//!
//! The collector is cheap to clone and safe to share across concurrently
//! running jobs; all mutable state lives behind the cache, throttle, and
//! statistics handles.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::cache::{CacheKey, CacheStore, Cached};
use crate::provider_policy::ProviderPolicy;
use crate::quality::{QualityConfig, QualityValidator, QualityVerdict};
use crate::registry::AdapterRegistry;
use crate::retry::{RetryConfig, RetryExecutor};
use crate::stats::{SourceStats, StatsRegistry};
use crate::throttling::ThrottlingQueue;
use crate::{DataType, FetchRequest, Location, ProviderId, SourceError, WeatherRecord};

/// Where a returned record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOrigin {
    /// Fresh cache entry; no network round happened.
    CacheHit,
    /// Fetched from the provider on this call.
    Fetched,
    /// The fetch failed but an expired cache entry was still available.
    StaleFallback,
}

/// Outcome of a single collection call.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionResult {
    pub record: WeatherRecord,
    pub verdict: QualityVerdict,
    pub origin: RecordOrigin,
    pub latency: Duration,
}

#[derive(Clone)]
pub struct Collector {
    registry: Arc<AdapterRegistry>,
    cache: CacheStore,
    validator: Arc<QualityValidator>,
    retry: Arc<RetryExecutor>,
    stats: StatsRegistry,
    throttles: Arc<HashMap<ProviderId, ThrottlingQueue>>,
}

impl Collector {
    /// Collector with stock cache TTL, retry budget, quality thresholds,
    /// and per-provider quotas.
    pub fn new(registry: AdapterRegistry) -> Self {
        Self::with_components(
            registry,
            CacheStore::with_default_ttl(),
            RetryConfig::default(),
            QualityConfig::default(),
        )
    }

    pub fn with_components(
        registry: AdapterRegistry,
        cache: CacheStore,
        retry: RetryConfig,
        quality: QualityConfig,
    ) -> Self {
        let throttles = registry
            .ids()
            .into_iter()
            .map(|id| {
                (
                    id,
                    ThrottlingQueue::from_policy(&ProviderPolicy::default_for(id)),
                )
            })
            .collect();

        Self {
            registry: Arc::new(registry),
            cache,
            validator: Arc::new(QualityValidator::new(quality)),
            retry: Arc::new(RetryExecutor::new(retry)),
            stats: StatsRegistry::new(),
            throttles: Arc::new(throttles),
        }
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Run the full pipeline for one (source, location, data type) triple.
    ///
    /// A fresh cache entry short-circuits before the throttle; otherwise
    /// the provider is fetched under the retry budget, the record is
    /// scored, and the scored record is cached. When the fetch fails and
    /// an expired entry is still present, that entry is served as a
    /// stale fallback instead of surfacing the error.
    ///
    /// # Errors
    ///
    /// Returns the terminal [`SourceError`] of the attempt when no cached
    /// record can stand in for the failure.
    pub async fn collect(
        &self,
        source: ProviderId,
        location: Location,
        data_type: DataType,
    ) -> Result<CollectionResult, SourceError> {
        let started = Instant::now();
        let key = CacheKey::new(source, location, data_type);

        let cached = self.cache.get(&key).await;
        if let Some(hit) = cached.as_ref().filter(|hit| hit.is_fresh) {
            self.stats.record_cache_hit(source);
            debug!(source = %source, data_type = %data_type, "serving fresh cache entry");
            return Ok(CollectionResult {
                verdict: self.verdict_for(&hit.record),
                record: hit.record.clone(),
                origin: RecordOrigin::CacheHit,
                latency: started.elapsed(),
            });
        }
        self.stats.record_cache_miss(source);

        match self.fetch_scored(source, location, data_type).await {
            Ok((record, verdict)) => {
                self.cache.put(key, record.clone(), None).await;
                let latency = started.elapsed();
                self.stats.record_success(source, latency);
                if verdict == QualityVerdict::Flagged {
                    self.stats.record_flagged(source);
                    warn!(
                        source = %source,
                        data_type = %data_type,
                        score = record.quality_score.unwrap_or(0.0),
                        "record flagged by quality validation"
                    );
                }
                Ok(CollectionResult {
                    record,
                    verdict,
                    origin: RecordOrigin::Fetched,
                    latency,
                })
            }
            Err(error) => {
                self.stats
                    .record_failure(source, started.elapsed(), error.message());
                if let Some(stale) = cached {
                    warn!(
                        source = %source,
                        data_type = %data_type,
                        error = %error,
                        "fetch failed; serving expired cache entry"
                    );
                    return Ok(CollectionResult {
                        verdict: self.verdict_for(&stale.record),
                        record: stale.record,
                        origin: RecordOrigin::StaleFallback,
                        latency: started.elapsed(),
                    });
                }
                Err(error)
            }
        }
    }

    /// Read-only cache lookup; never touches the network. A stale entry
    /// is still returned, tagged `is_fresh == false`.
    pub async fn get_latest(
        &self,
        source: ProviderId,
        location: Location,
        data_type: DataType,
    ) -> Option<Cached> {
        let key = CacheKey::new(source, location, data_type);
        self.cache.get(&key).await
    }

    pub fn statistics(&self) -> HashMap<ProviderId, SourceStats> {
        self.stats.snapshot_all()
    }

    pub fn statistics_for(&self, source: ProviderId) -> SourceStats {
        self.stats.snapshot(source)
    }

    /// Counter handle for failures observed outside `collect`, such as a
    /// scheduler-imposed deadline cancelling a run.
    pub(crate) fn stats_registry(&self) -> &StatsRegistry {
        &self.stats
    }

    async fn fetch_scored(
        &self,
        source: ProviderId,
        location: Location,
        data_type: DataType,
    ) -> Result<(WeatherRecord, QualityVerdict), SourceError> {
        let adapter = self.registry.get(source)?;
        if !adapter.capabilities().supports(data_type) {
            return Err(SourceError::unsupported_data_type(source, data_type));
        }

        if let Some(throttle) = self.throttles.get(&source) {
            throttle.acquire().await?;
        }

        let request = FetchRequest::new(location, data_type);
        let record = self
            .retry
            .execute(|| adapter.fetch(request))
            .await?;

        let (record, verdict) = self.validator.validate(record);
        info!(
            source = %source,
            data_type = %data_type,
            score = record.quality_score.unwrap_or(0.0),
            accepted = verdict.is_accepted(),
            "collected record"
        );
        Ok((record, verdict))
    }

    /// Verdict for an already-scored record; unscored records are treated
    /// as accepted since they never went through validation.
    fn verdict_for(&self, record: &WeatherRecord) -> QualityVerdict {
        match record.quality_score {
            Some(score) if score < self.validator.config().threshold => QualityVerdict::Flagged,
            _ => QualityVerdict::Accepted,
        }
    }
}
