//! Shared, swappable rule set with memoized resolution.
//!
//! Uses `ArcSwap` so a new rule set can be installed atomically while other
//! threads keep resolving against the one they already loaded. Each installed
//! set gets a fresh generation number; cached results are keyed by it.

use crate::cache::{CacheKey, ResolutionCache};
use crate::error::RuleResult;
use crate::resolver::{DependencyResolver, FailurePolicy, ResolvedConfig, Resolver};
use crate::rules::{RuleSet, Target};
use arc_swap::ArcSwap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// A rule set together with the generation it was installed as.
#[derive(Debug)]
pub struct Snapshot {
    pub generation: u64,
    pub rules: RuleSet,
}

/// Owner of the active rule set for a process or component.
pub struct RuleRegistry {
    current: ArcSwap<Snapshot>,
    next_generation: AtomicU64,
    resolver: Resolver,
    cache: Option<ResolutionCache>,
}

impl RuleRegistry {
    /// Registry with caching enabled and the abort policy.
    pub fn new(rules: RuleSet) -> Self {
        Self {
            current: ArcSwap::from_pointee(Snapshot {
                generation: 0,
                rules,
            }),
            next_generation: AtomicU64::new(1),
            resolver: Resolver::new(),
            cache: Some(ResolutionCache::new()),
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.resolver = self.resolver.with_policy(policy);
        self
    }

    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache = enabled.then(ResolutionCache::new);
        self
    }

    /// The active snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    pub fn generation(&self) -> u64 {
        self.current.load().generation
    }

    /// Number of cached resolutions.
    pub fn cached(&self) -> usize {
        self.cache.as_ref().map_or(0, ResolutionCache::len)
    }

    /// Install a new rule set; cached results of earlier sets are dropped,
    /// including ones still being computed.
    pub fn replace(&self, rules: RuleSet) {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let count = rules.len();
        self.current.store(Arc::new(Snapshot { generation, rules }));
        if let Some(ref cache) = self.cache {
            cache.retain_generation(generation);
        }
        info!(generation, rules = count, "Rule set replaced");
    }

    /// Resolve `target` against the active rule set.
    pub fn resolve<D>(&self, target: &Target, deps: &D) -> RuleResult<Arc<ResolvedConfig>>
    where
        D: DependencyResolver + ?Sized,
    {
        let snapshot = self.current.load_full();
        let resolve = || self.resolver.resolve(target, &snapshot.rules, deps);
        match self.cache {
            Some(ref cache) => {
                cache.get_or_resolve(CacheKey::new(snapshot.generation, target.clone()), resolve)
            }
            None => resolve().map(Arc::new),
        }
    }
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.current.load();
        f.debug_struct("RuleRegistry")
            .field("generation", &snapshot.generation)
            .field("rules", &snapshot.rules.len())
            .field("policy", &self.resolver.policy())
            .field("cached", &self.cached())
            .finish()
    }
}
