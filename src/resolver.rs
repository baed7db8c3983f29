//! Rule resolution.
//!
//! Computes the effective configuration for a [`Target`]: select the matching
//! rules, order them by ascending priority (declaration order breaks ties),
//! and deep-merge their payloads so later rules win.
//!
//! Dynamic payloads pull named dependencies through a [`DependencyResolver`].
//! When one cannot be supplied, the [`FailurePolicy`] decides between failing
//! the whole resolution and skipping that rule.

use crate::error::{RuleError, RuleResult, RuleSource};
use crate::merge::merge_maps;
use crate::rules::{ApplyPayload, Priority, Rule, RuleSet, Target};
use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Supplies named external values to dynamic rule payloads.
///
/// Must be safe to call from several resolutions at once if the caller
/// resolves concurrently.
pub trait DependencyResolver {
    fn resolve_dependency(&self, name: &str) -> anyhow::Result<Value>;
}

impl<T: DependencyResolver + ?Sized> DependencyResolver for &T {
    fn resolve_dependency(&self, name: &str) -> anyhow::Result<Value> {
        (**self).resolve_dependency(name)
    }
}

/// Resolver that knows no dependencies.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDependencies;

impl DependencyResolver for NoDependencies {
    fn resolve_dependency(&self, name: &str) -> anyhow::Result<Value> {
        Err(anyhow!("no provider for '{}'", name))
    }
}

/// Dependencies backed by a fixed name → value table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MapDependencies(BTreeMap<String, Value>);

impl MapDependencies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace a dependency, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(name.into(), value)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl FromIterator<(String, Value)> for MapDependencies {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl DependencyResolver for MapDependencies {
    fn resolve_dependency(&self, name: &str) -> anyhow::Result<Value> {
        self.0
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow!("'{}' is not provided", name))
    }
}

impl<S: std::hash::BuildHasher> DependencyResolver for HashMap<String, Value, S> {
    fn resolve_dependency(&self, name: &str) -> anyhow::Result<Value> {
        self.get(name)
            .cloned()
            .ok_or_else(|| anyhow!("'{}' is not provided", name))
    }
}

/// Dependencies computed by a closure.
#[derive(Debug, Clone, Copy)]
pub struct FnDependencies<F>(F);

/// Wrap a closure as a [`DependencyResolver`].
pub fn from_fn<F>(f: F) -> FnDependencies<F>
where
    F: Fn(&str) -> anyhow::Result<Value>,
{
    FnDependencies(f)
}

impl<F> DependencyResolver for FnDependencies<F>
where
    F: Fn(&str) -> anyhow::Result<Value>,
{
    fn resolve_dependency(&self, name: &str) -> anyhow::Result<Value> {
        (self.0)(name)
    }
}

/// What to do when a dynamic rule's dependency cannot be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Fail the resolution; no partial configuration is returned (default).
    #[default]
    Abort,
    /// Leave the rule out and keep going.
    Skip,
}

impl std::str::FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "abort" => Ok(FailurePolicy::Abort),
            "skip" => Ok(FailurePolicy::Skip),
            _ => Err(format!("Invalid policy '{}'. Valid options: abort, skip", s)),
        }
    }
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailurePolicy::Abort => write!(f, "abort"),
            FailurePolicy::Skip => write!(f, "skip"),
        }
    }
}

/// A rule that contributed to a resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedRule {
    /// Declaration index within the rule set.
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub priority: Priority,
    pub origin: RuleSource,
}

/// A matching rule left out under [`FailurePolicy::Skip`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRule {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub reason: String,
}

/// The effective configuration for one target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedConfig {
    pub target: Target,
    /// The merged configuration object.
    pub values: Value,
    /// Contributing rules, in the order they were merged.
    pub applied: Vec<AppliedRule>,
    pub skipped: Vec<SkippedRule>,
}

impl ResolvedConfig {
    pub fn values(&self) -> &Value {
        &self.values
    }

    pub fn into_values(self) -> Value {
        self.values
    }

    /// Look up a value by JSON pointer, e.g. `/extension/legendShape`.
    pub fn pointer(&self, pointer: &str) -> Option<&Value> {
        self.values.pointer(pointer)
    }

    /// True when no rule contributed anything.
    pub fn is_empty(&self) -> bool {
        self.values.as_object().is_none_or(Map::is_empty)
    }
}

/// Merges matching rules for a target.
#[derive(Debug, Clone, Copy, Default)]
pub struct Resolver {
    policy: FailurePolicy,
}

impl Resolver {
    /// A resolver with the default (abort) policy.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Compute the effective configuration for `target`.
    ///
    /// A target no rule matches resolves to an empty object. `rules` is only
    /// read; payloads are cloned into the result.
    pub fn resolve<D>(&self, target: &Target, rules: &RuleSet, deps: &D) -> RuleResult<ResolvedConfig>
    where
        D: DependencyResolver + ?Sized,
    {
        let mut values = Map::new();
        let mut applied = Vec::new();
        let mut skipped = Vec::new();

        for (index, rule) in rules.applicable(target) {
            let payload = match payload_for(index, rule, deps) {
                Ok(payload) => payload,
                Err(err) => match self.policy {
                    FailurePolicy::Abort => return Err(err),
                    FailurePolicy::Skip => {
                        warn!(module = %target.module, "Skipping {}", err);
                        skipped.push(SkippedRule {
                            index,
                            name: rule.name().map(str::to_string),
                            reason: err.to_string(),
                        });
                        continue;
                    }
                },
            };

            debug!(
                module = %target.module,
                application = target.application.as_deref().unwrap_or(""),
                rule = index,
                name = rule.name().unwrap_or(""),
                priority = %rule.priority(),
                "Applying rule"
            );
            merge_maps(&mut values, payload);
            applied.push(AppliedRule {
                index,
                name: rule.name().map(str::to_string),
                priority: rule.priority(),
                origin: rule.origin().clone(),
            });
        }

        Ok(ResolvedConfig {
            target: target.clone(),
            values: Value::Object(values),
            applied,
            skipped,
        })
    }
}

/// Resolve with no dependencies and the abort policy.
pub fn resolve(target: &Target, rules: &RuleSet) -> RuleResult<ResolvedConfig> {
    Resolver::new().resolve(target, rules, &NoDependencies)
}

/// The object a rule contributes, computing dynamic payloads.
fn payload_for<D>(index: usize, rule: &Rule, deps: &D) -> RuleResult<Map<String, Value>>
where
    D: DependencyResolver + ?Sized,
{
    match rule.apply() {
        ApplyPayload::Static(payload) => Ok(payload.clone()),
        ApplyPayload::Dynamic {
            dependencies,
            factory,
        } => {
            let values = dependencies
                .iter()
                .map(|name| {
                    deps.resolve_dependency(name)
                        .map_err(|e| RuleError::DependencyResolution {
                            rule: index,
                            origin: rule.origin().clone(),
                            dependency: name.clone(),
                            reason: e.to_string(),
                        })
                })
                .collect::<RuleResult<Vec<Value>>>()?;
            Ok(factory.call(&values))
        }
    }
}
