//! Single-slot cache of the last solved model.
//!
//! Keyed by the model fingerprint of the specification. A hit lets a
//! request skip building and solving; any other key replaces the slot.
//! Only the worker touches the cache, under the worker lock.

use std::sync::Arc;

use solver::SolvedModel;
use tracing::debug;

struct Slot {
    key: String,
    value: Arc<dyn SolvedModel>,
}

#[derive(Default)]
pub struct SolveCache {
    slot: Option<Slot>,
    /// Incremented on every insert.
    generation: u64,
}

impl SolveCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached model, if it was solved for `key`.
    pub fn get(&self, key: &str) -> Option<Arc<dyn SolvedModel>> {
        self.slot
            .as_ref()
            .filter(|slot| slot.key == key)
            .map(|slot| slot.value.clone())
    }

    /// Store `value` under `key`, evicting whatever was cached.
    pub fn insert(&mut self, key: impl Into<String>, value: Arc<dyn SolvedModel>) -> u64 {
        let key = key.into();
        if let Some(old) = &self.slot {
            debug!(old = %old.key, new = %key, "Replacing cached model");
        }
        self.slot = Some(Slot { key, value });
        self.generation += 1;
        self.generation
    }

    pub fn key(&self) -> Option<&str> {
        self.slot.as_ref().map(|slot| slot.key.as_str())
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn clear(&mut self) {
        self.slot = None;
    }
}

impl std::fmt::Debug for SolveCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolveCache")
            .field("key", &self.key())
            .field("generation", &self.generation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Flat(f64);

    impl SolvedModel for Flat {
        fn naq(&self) -> usize {
            1
        }

        fn head(&self, _x: f64, _y: f64) -> Vec<f64> {
            vec![self.0]
        }
    }

    #[test]
    fn test_hit_and_miss() {
        let mut cache = SolveCache::new();
        assert!(cache.get("a").is_none());

        assert_eq!(cache.insert("a", Arc::new(Flat(1.0))), 1);
        assert_eq!(cache.get("a").unwrap().head(0.0, 0.0), vec![1.0]);
        assert!(cache.get("b").is_none());
    }

    #[test]
    fn test_mismatch_overwrites() {
        let mut cache = SolveCache::new();
        cache.insert("a", Arc::new(Flat(1.0)));
        cache.insert("b", Arc::new(Flat(2.0)));

        assert!(cache.get("a").is_none());
        assert_eq!(cache.get("b").unwrap().head(0.0, 0.0), vec![2.0]);
        assert_eq!(cache.generation(), 2);
        assert_eq!(cache.key(), Some("b"));
    }

    #[test]
    fn test_clear() {
        let mut cache = SolveCache::new();
        cache.insert("a", Arc::new(Flat(1.0)));
        cache.clear();
        assert!(cache.get("a").is_none());
        assert_eq!(cache.generation(), 1);
    }
}
