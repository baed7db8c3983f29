//! Rule data model: priorities, selectors, apply payloads and rule sets.

use crate::error::RuleSource;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Rule priority. Rules apply in ascending priority, so higher values win.
///
/// Infinite priorities are allowed; NaN is not.
#[derive(Debug, Clone, Copy)]
pub struct Priority(f64);

impl Priority {
    /// Priority of a rule that omits one.
    pub const DEFAULT: Priority = Priority(0.0);
    /// Visualization-wide defaults.
    pub const VIZ_DEFAULT: Priority = Priority(-5.0);
    /// Application-specific defaults, applied over visualization defaults.
    pub const APP_DEFAULT: Priority = Priority(-1.0);
    /// Always applied last among the matching rules.
    pub const INFINITY: Priority = Priority(f64::INFINITY);

    /// Returns `None` for NaN.
    pub fn new(value: f64) -> Option<Self> {
        if value.is_nan() {
            return None;
        }
        // -0.0 and 0.0 must tie so declaration order decides
        Some(Priority(if value == 0.0 { 0.0 } else { value }))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn is_infinite(self) -> bool {
        self.0.is_infinite()
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::DEFAULT
    }
}

impl PartialEq for Priority {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Priority {}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Priority {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == f64::INFINITY {
            write!(f, "Infinity")
        } else if self.0 == f64::NEG_INFINITY {
            write!(f, "-Infinity")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl Serialize for Priority {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.is_infinite() {
            serializer.serialize_str(&self.to_string())
        } else {
            serializer.serialize_f64(self.0)
        }
    }
}

/// One or many string patterns. A single string is a one-element set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Patterns(Vec<String>);

impl Patterns {
    pub fn new(patterns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self(patterns.into_iter().map(Into::into).collect())
    }

    /// Exact, case-sensitive membership.
    pub fn contains(&self, value: &str) -> bool {
        self.0.iter().any(|p| p == value)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Patterns {
    fn from(value: &str) -> Self {
        Self(vec![value.to_string()])
    }
}

impl From<String> for Patterns {
    fn from(value: String) -> Self {
        Self(vec![value])
    }
}

impl From<Vec<String>> for Patterns {
    fn from(values: Vec<String>) -> Self {
        Self(values)
    }
}

impl From<Vec<&str>> for Patterns {
    fn from(values: Vec<&str>) -> Self {
        Self::new(values)
    }
}

impl<const N: usize> From<[&str; N]> for Patterns {
    fn from(values: [&str; N]) -> Self {
        Self::new(values)
    }
}

impl fmt::Display for Patterns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(", "))
    }
}

/// The consumer requesting configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Target {
    pub module: String,
    pub application: Option<String>,
}

impl Target {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            application: None,
        }
    }

    pub fn with_application(mut self, application: impl Into<String>) -> Self {
        self.application = Some(application.into());
        self
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.application {
            Some(ref app) => write!(f, "{} (application {})", self.module, app),
            None => write!(f, "{}", self.module),
        }
    }
}

/// The (module, application) match predicate of a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selector {
    pub module: Patterns,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application: Option<Patterns>,
}

impl Selector {
    pub fn module(module: impl Into<Patterns>) -> Self {
        Self {
            module: module.into(),
            application: None,
        }
    }

    pub fn with_application(mut self, application: impl Into<Patterns>) -> Self {
        self.application = Some(application.into());
        self
    }

    /// Module must be listed; application must be listed when the selector names any.
    ///
    /// A selector with application patterns never matches a target without an
    /// application.
    pub fn matches(&self, target: &Target) -> bool {
        if !self.module.contains(&target.module) {
            return false;
        }
        match (&self.application, &target.application) {
            (None, _) => true,
            (Some(patterns), Some(app)) => patterns.contains(app),
            (Some(_), None) => false,
        }
    }
}

/// Signature of a dynamic payload factory.
///
/// Receives the dependency values in declared order.
pub type FactoryFn = dyn Fn(&[Value]) -> Map<String, Value> + Send + Sync;

/// A named function producing a configuration object from dependencies.
#[derive(Clone)]
pub struct Factory {
    name: String,
    func: Arc<FactoryFn>,
}

impl Factory {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&[Value]) -> Map<String, Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, dependencies: &[Value]) -> Map<String, Value> {
        (self.func)(dependencies)
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory").field("name", &self.name).finish()
    }
}

/// What a matching rule contributes to the resolved configuration.
#[derive(Debug, Clone)]
pub enum ApplyPayload {
    /// A fixed object tree.
    Static(Map<String, Value>),
    /// An object tree computed from named dependencies at resolution time.
    Dynamic {
        dependencies: Vec<String>,
        factory: Factory,
    },
}

impl ApplyPayload {
    pub fn is_dynamic(&self) -> bool {
        matches!(self, ApplyPayload::Dynamic { .. })
    }
}

/// A prioritized, conditionally matched configuration override.
#[derive(Debug, Clone)]
pub struct Rule {
    name: Option<String>,
    priority: Priority,
    select: Selector,
    apply: ApplyPayload,
    origin: RuleSource,
}

impl Rule {
    pub fn new(select: Selector, apply: ApplyPayload) -> Self {
        Self {
            name: None,
            priority: Priority::DEFAULT,
            select,
            apply,
            origin: RuleSource::Inline,
        }
    }

    /// Convenience for a rule with a static payload.
    pub fn with_static(select: Selector, apply: Map<String, Value>) -> Self {
        Self::new(select, ApplyPayload::Static(apply))
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_origin(mut self, origin: RuleSource) -> Self {
        self.origin = origin;
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn select(&self) -> &Selector {
        &self.select
    }

    pub fn apply(&self) -> &ApplyPayload {
        &self.apply
    }

    pub fn origin(&self) -> &RuleSource {
        &self.origin
    }

    pub fn matches(&self, target: &Target) -> bool {
        self.select.matches(target)
    }
}

/// An immutable, ordered collection of rules.
///
/// A rule's declaration index is its position in the set.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Rule> {
        self.rules.get(index)
    }

    /// Rules in declaration order, with their declaration index.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Rule)> {
        self.rules.iter().enumerate()
    }

    /// Rules matching `target`, in application order.
    ///
    /// Ascending priority; equal priorities keep declaration order.
    pub fn applicable(&self, target: &Target) -> Vec<(usize, &Rule)> {
        let mut matches: Vec<(usize, &Rule)> =
            self.iter().filter(|(_, rule)| rule.matches(target)).collect();
        // sort_by_key is stable
        matches.sort_by_key(|(_, rule)| rule.priority());
        matches
    }

    /// Every rule in application order, ignoring selectors.
    pub fn ordered(&self) -> Vec<(usize, &Rule)> {
        let mut all: Vec<(usize, &Rule)> = self.iter().collect();
        all.sort_by_key(|(_, rule)| rule.priority());
        all
    }
}

impl FromIterator<Rule> for RuleSet {
    fn from_iter<I: IntoIterator<Item = Rule>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("payload must be an object"),
        }
    }

    #[test]
    fn test_priority_rejects_nan() {
        assert!(Priority::new(f64::NAN).is_none());
        assert_eq!(Priority::new(-0.0), Some(Priority::DEFAULT));
    }

    #[test]
    fn test_priority_ordering() {
        let mut priorities = vec![
            Priority::INFINITY,
            Priority::DEFAULT,
            Priority::VIZ_DEFAULT,
            Priority::new(f64::NEG_INFINITY).unwrap(),
            Priority::APP_DEFAULT,
        ];
        priorities.sort();
        let values: Vec<String> = priorities.iter().map(ToString::to_string).collect();
        assert_eq!(values, vec!["-Infinity", "-5", "-1", "0", "Infinity"]);
    }

    #[test]
    fn test_priority_serializes_infinity_as_string() {
        assert_eq!(serde_json::to_value(Priority::INFINITY).unwrap(), json!("Infinity"));
        assert_eq!(serde_json::to_value(Priority::VIZ_DEFAULT).unwrap(), json!(-5.0));
    }

    #[test]
    fn test_selector_module_only_matches_any_application() {
        let selector = Selector::module("viz/Bar");
        assert!(selector.matches(&Target::new("viz/Bar")));
        assert!(selector.matches(&Target::new("viz/Bar").with_application("app/x")));
        assert!(!selector.matches(&Target::new("viz/Line")));
    }

    #[test]
    fn test_selector_application_set() {
        let selector = Selector::module(["viz/Bar", "viz/Line"]).with_application(["x", "y"]);
        assert!(selector.matches(&Target::new("viz/Line").with_application("x")));
        assert!(selector.matches(&Target::new("viz/Bar").with_application("y")));
        assert!(!selector.matches(&Target::new("viz/Bar").with_application("z")));
        assert!(!selector.matches(&Target::new("viz/Bar")));
    }

    #[test]
    fn test_single_string_equals_single_element_set() {
        assert_eq!(Patterns::from("a"), Patterns::from(vec!["a"]));
    }

    #[test]
    fn test_applicable_is_stable_by_priority() {
        let select = || Selector::module("m");
        let rules = RuleSet::new(vec![
            Rule::with_static(select(), payload(json!({"r": 0}))).with_priority(Priority::INFINITY),
            Rule::with_static(select(), payload(json!({"r": 1}))),
            Rule::with_static(Selector::module("other"), payload(json!({"r": 2}))),
            Rule::with_static(select(), payload(json!({"r": 3}))).with_priority(Priority::VIZ_DEFAULT),
            Rule::with_static(select(), payload(json!({"r": 4}))),
        ]);
        let order: Vec<usize> = rules
            .applicable(&Target::new("m"))
            .into_iter()
            .map(|(index, _)| index)
            .collect();
        assert_eq!(order, vec![3, 1, 4, 0]);
    }

    #[test]
    fn test_factory_debug_shows_name() {
        let factory = Factory::new("noop", |_| Map::new());
        assert_eq!(format!("{:?}", factory), "Factory { name: \"noop\" }");
        assert!(factory.call(&[]).is_empty());
    }
}
