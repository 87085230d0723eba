//! Per-source collection counters.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;

use crate::ProviderId;

/// Smoothing factor for the rolling latency average.
const LATENCY_EWMA_ALPHA: f64 = 0.2;

/// Monotonic counters for one source. Reset only at process restart.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SourceStats {
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub flagged: u64,
    /// Exponentially weighted moving average over fetch latencies.
    pub avg_latency_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl SourceStats {
    pub fn success_rate(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.successes as f64 / self.attempts as f64
        }
    }
}

/// Shared registry of per-source statistics, safe to update from any number
/// of in-flight jobs. Lock scope is a single counter update, never I/O.
#[derive(Debug, Clone, Default)]
pub struct StatsRegistry {
    inner: Arc<Mutex<HashMap<ProviderId, SourceStats>>>,
}

impl StatsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self, source: ProviderId, latency: Duration) {
        let mut map = self.lock();
        let stats = map.entry(source).or_default();
        stats.attempts += 1;
        stats.successes += 1;
        update_latency(stats, latency);
    }

    pub fn record_failure(&self, source: ProviderId, latency: Duration, error: &str) {
        let mut map = self.lock();
        let stats = map.entry(source).or_default();
        stats.attempts += 1;
        stats.failures += 1;
        stats.last_error = Some(error.to_owned());
        update_latency(stats, latency);
    }

    pub fn record_cache_hit(&self, source: ProviderId) {
        let mut map = self.lock();
        map.entry(source).or_default().cache_hits += 1;
    }

    pub fn record_cache_miss(&self, source: ProviderId) {
        let mut map = self.lock();
        map.entry(source).or_default().cache_misses += 1;
    }

    pub fn record_flagged(&self, source: ProviderId) {
        let mut map = self.lock();
        map.entry(source).or_default().flagged += 1;
    }

    /// Counters for one source; zeros when nothing was recorded yet.
    pub fn snapshot(&self, source: ProviderId) -> SourceStats {
        self.lock().get(&source).cloned().unwrap_or_default()
    }

    pub fn snapshot_all(&self) -> HashMap<ProviderId, SourceStats> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ProviderId, SourceStats>> {
        self.inner.lock().expect("stats lock is not poisoned")
    }
}

fn update_latency(stats: &mut SourceStats, latency: Duration) {
    let sample = latency.as_secs_f64() * 1000.0;
    if stats.avg_latency_ms == 0.0 {
        stats.avg_latency_ms = sample;
    } else {
        stats.avg_latency_ms =
            LATENCY_EWMA_ALPHA * sample + (1.0 - LATENCY_EWMA_ALPHA) * stats.avg_latency_ms;
    }
}
