//! Memoization of resolved configurations.
//!
//! Resolution is deterministic for a fixed rule set and target, so results
//! can be reused. The cache is owned by whoever constructs it and is never
//! process-global.
//!
//! Keys carry the rule-set generation, so a result computed against an older
//! rule set can never be returned for a newer one. Once a generation has been
//! retired, late results for it are returned to their caller but not stored.

use crate::error::RuleResult;
use crate::resolver::ResolvedConfig;
use crate::rules::Target;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Identifies one resolution: which rule set, which target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub generation: u64,
    pub target: Target,
}

impl CacheKey {
    pub fn new(generation: u64, target: Target) -> Self {
        Self { generation, target }
    }
}

#[derive(Debug, Default)]
struct Entries {
    /// Oldest generation still accepted for insertion.
    floor: u64,
    map: HashMap<CacheKey, Arc<ResolvedConfig>>,
}

/// Thread-safe map from [`CacheKey`] to resolved configuration.
///
/// Only successful resolutions are stored.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    entries: Mutex<Entries>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, Entries> {
        // A panic elsewhere cannot leave a half-written entry behind
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<ResolvedConfig>> {
        self.entries().map.get(key).cloned()
    }

    /// Return the cached entry, or run `resolve` and cache its success.
    ///
    /// The lock is not held while `resolve` runs; two callers racing on the
    /// same key may both compute, and the first stored result wins.
    pub fn get_or_resolve<F>(&self, key: CacheKey, resolve: F) -> RuleResult<Arc<ResolvedConfig>>
    where
        F: FnOnce() -> RuleResult<ResolvedConfig>,
    {
        if let Some(hit) = self.get(&key) {
            return Ok(hit);
        }
        let resolved = Arc::new(resolve()?);
        let mut entries = self.entries();
        if key.generation < entries.floor {
            return Ok(resolved);
        }
        Ok(Arc::clone(entries.map.entry(key).or_insert(resolved)))
    }

    /// Drop entries from generations other than `generation` and refuse
    /// later inserts for anything older.
    pub fn retain_generation(&self, generation: u64) {
        let mut entries = self.entries();
        entries.floor = entries.floor.max(generation);
        entries.map.retain(|key, _| key.generation == generation);
    }

    pub fn clear(&self) {
        self.entries().map.clear();
    }

    pub fn len(&self) -> usize {
        self.entries().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().map.is_empty()
    }
}
