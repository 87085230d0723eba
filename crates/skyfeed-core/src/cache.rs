//! TTL-keyed in-memory store for the most recent record per
//! (source, bucketed location, data type).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::{DataType, Location, LocationKey, ProviderId, WeatherRecord};

/// Cache key over (source, bucketed location, data type).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub source: ProviderId,
    pub location: LocationKey,
    pub data_type: DataType,
}

impl CacheKey {
    pub fn new(source: ProviderId, location: Location, data_type: DataType) -> Self {
        Self {
            source,
            location: location.key(),
            data_type,
        }
    }
}

/// A cached record with its freshness tag. Stale entries are still served
/// so callers can choose availability over failing closed during an outage.
#[derive(Debug, Clone, PartialEq)]
pub struct Cached {
    pub record: WeatherRecord,
    pub is_fresh: bool,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    record: WeatherRecord,
    expires_at: Instant,
}

#[derive(Debug)]
struct CacheInner {
    map: HashMap<CacheKey, CacheEntry>,
    default_ttl: Duration,
}

impl CacheInner {
    fn new(default_ttl: Duration) -> Self {
        Self {
            map: HashMap::new(),
            default_ttl,
        }
    }

    fn get(&self, key: &CacheKey) -> Option<Cached> {
        self.map.get(key).map(|entry| Cached {
            record: entry.record.clone(),
            is_fresh: Instant::now() <= entry.expires_at,
        })
    }

    fn put(&mut self, key: CacheKey, record: WeatherRecord, ttl_override: Option<Duration>) {
        let ttl = ttl_override.unwrap_or(self.default_ttl);
        let expires_at = Instant::now() + ttl;
        self.map.insert(key, CacheEntry { record, expires_at });
    }

    fn clear(&mut self) {
        self.map.clear();
    }

    fn len(&self) -> usize {
        self.map.len()
    }
}

/// Thread-safe store holding at most one "current" record per key.
///
/// Expiry is lazy: it is checked on read and flips the freshness tag, it
/// never deletes. A newer `put` is the only thing that replaces an entry.
#[derive(Debug, Clone)]
pub struct CacheStore {
    inner: Arc<tokio::sync::RwLock<CacheInner>>,
}

impl CacheStore {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(tokio::sync::RwLock::new(CacheInner::new(default_ttl))),
        }
    }

    /// Cache store with the stock 5 minute TTL.
    pub fn with_default_ttl() -> Self {
        Self::new(Duration::from_secs(300))
    }

    /// Disabled cache: nothing is stored, every `get` is a miss.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Look up the latest record for a key.
    ///
    /// Returns `None` only when no entry exists; a present-but-expired
    /// entry comes back with `is_fresh == false`.
    pub async fn get(&self, key: &CacheKey) -> Option<Cached> {
        let store = self.inner.read().await;
        store.get(key)
    }

    /// Store a record, overwriting any previous entry for the key.
    /// No-op when the cache is disabled.
    pub async fn put(
        &self,
        key: CacheKey,
        record: WeatherRecord,
        ttl_override: Option<Duration>,
    ) {
        let mut store = self.inner.write().await;

        if store.default_ttl == Duration::ZERO {
            return;
        }

        store.put(key, record, ttl_override);
    }

    pub async fn clear(&self) {
        let mut store = self.inner.write().await;
        store.clear();
    }

    pub async fn len(&self) -> usize {
        let store = self.inner.read().await;
        store.len()
    }

    pub async fn is_disabled(&self) -> bool {
        let store = self.inner.read().await;
        store.default_ttl == Duration::ZERO
    }
}
