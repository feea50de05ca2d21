//! Per-client assignment cache.

use std::{collections::HashMap, sync::Arc};

use caldb_types::{Assignment, CacheKey};

/// Cache of resolved assignments keyed by the fully resolved request.
///
/// The cache is unbounded and never evicts: calibration sets are
/// read-mostly and bounded in number for a given process run, so entries
/// are kept for the life of the client. Long-lived processes issuing many
/// distinct requests will grow this without limit; disable caching for
/// such workloads.
///
/// Enablement is a runtime toggle. While disabled, `get` always misses
/// and `put` is a no-op, so every resolution reaches the provider.
#[derive(Debug)]
pub struct AssignmentCache {
    entries: HashMap<CacheKey, Arc<Assignment>>,
    enabled: bool,
}

impl Default for AssignmentCache {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            enabled: true,
        }
    }
}

impl AssignmentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<Assignment>> {
        if !self.enabled {
            return None;
        }
        self.entries.get(key).cloned()
    }

    pub fn put(&mut self, key: CacheKey, assignment: Arc<Assignment>) {
        if !self.enabled {
            return;
        }
        self.entries.insert(key, assignment);
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caldb_types::{ResolvedRequest, TypeTable};

    fn entry(path: &str) -> (CacheKey, Arc<Assignment>) {
        let request = ResolvedRequest {
            path: path.into(),
            run: 0,
            variation: "default".into(),
            time: 0,
            load_columns: true,
        };
        let key = CacheKey::from(&request);
        let assignment = Arc::new(Assignment::new(
            TypeTable::default(),
            vec![vec!["1".into()]],
            request,
        ));
        (key, assignment)
    }

    #[test]
    fn stores_and_returns_entries() {
        let mut cache = AssignmentCache::new();
        let (key, assignment) = entry("/a");
        assert!(cache.get(&key).is_none());
        cache.put(key.clone(), assignment);
        assert!(cache.get(&key).is_some());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn disabled_cache_misses_and_drops_puts() {
        let mut cache = AssignmentCache::new();
        let (key, assignment) = entry("/a");
        cache.put(key.clone(), assignment.clone());
        cache.set_enabled(false);
        assert!(cache.get(&key).is_none());

        let (other_key, other) = entry("/b");
        cache.put(other_key.clone(), other);
        cache.set_enabled(true);
        // The put issued while disabled never landed.
        assert!(cache.get(&other_key).is_none());
        assert!(cache.get(&key).is_some());
    }
}
