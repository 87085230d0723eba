//! Explicit adapter registry. Every source used at runtime is registered
//! up front; lookups for unregistered sources fail with a structured error
//! instead of falling back to any implicit wiring.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{ProviderId, SourceAdapter, SourceError};

#[derive(Default, Clone)]
pub struct AdapterRegistry {
    adapters: BTreeMap<ProviderId, Arc<dyn SourceAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its own id, replacing any previous
    /// registration for the same source.
    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) {
        self.adapters.insert(adapter.id(), adapter);
    }

    pub fn get(&self, provider: ProviderId) -> Result<Arc<dyn SourceAdapter>, SourceError> {
        self.adapters
            .get(&provider)
            .cloned()
            .ok_or_else(|| SourceError::adapter_not_registered(provider))
    }

    pub fn contains(&self, provider: ProviderId) -> bool {
        self.adapters.contains_key(&provider)
    }

    /// Registered source ids in stable order.
    pub fn ids(&self) -> Vec<ProviderId> {
        self.adapters.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("sources", &self.ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::NoaaAdapter;
    use crate::SourceErrorKind;

    #[test]
    fn lookup_of_an_unregistered_source_is_a_structured_error() {
        let registry = AdapterRegistry::new();
        let error = registry
            .get(ProviderId::Openweather)
            .expect_err("nothing registered");
        assert_eq!(error.kind(), SourceErrorKind::AdapterNotRegistered);
    }

    #[test]
    fn registration_is_keyed_by_the_adapter_id() {
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(NoaaAdapter::new()));

        assert!(registry.contains(ProviderId::Noaa));
        assert!(!registry.contains(ProviderId::Weatherapi));
        assert_eq!(registry.ids(), vec![ProviderId::Noaa]);

        let adapter = registry.get(ProviderId::Noaa).expect("registered");
        assert_eq!(adapter.id(), ProviderId::Noaa);
    }

    #[test]
    fn re_registration_replaces_the_previous_adapter() {
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(NoaaAdapter::new()));
        registry.register(Arc::new(NoaaAdapter::new()));
        assert_eq!(registry.len(), 1);
    }
}
