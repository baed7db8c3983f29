//! Assembling rule sets from several documents.
//!
//! Documents are concatenated in the order they are added, so declaration
//! order (and therefore tie-breaking between equal priorities) follows load
//! order across files.

use super::builtin::builtin_rules;
use super::factories::FactoryRegistry;
use super::parse::{LoadPolicy, parse_rules_str};
use super::types::{Rule, RuleSet};
use crate::error::{RuleError, RuleResult, RuleSource};
use std::path::Path;
use tracing::{debug, info};

/// Builder concatenating rule documents into one [`RuleSet`].
#[derive(Debug)]
pub struct RuleSetBuilder<'a> {
    factories: &'a FactoryRegistry,
    policy: LoadPolicy,
    rules: Vec<Rule>,
    rejected: Vec<RuleError>,
}

impl<'a> RuleSetBuilder<'a> {
    pub fn new(factories: &'a FactoryRegistry) -> Self {
        Self {
            factories,
            policy: LoadPolicy::default(),
            rules: Vec::new(),
            rejected: Vec::new(),
        }
    }

    pub fn with_policy(mut self, policy: LoadPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Append the embedded default rules.
    pub fn add_builtin(&mut self) -> RuleResult<&mut Self> {
        let rules = builtin_rules(self.factories)?;
        debug!(count = rules.len(), "Loaded builtin rules");
        self.rules.extend(rules);
        Ok(self)
    }

    /// Append the rules of a YAML/JSON document.
    pub fn add_str(&mut self, content: &str, origin: RuleSource) -> RuleResult<&mut Self> {
        let parsed = parse_rules_str(content, &origin, self.factories, self.policy)?;
        debug!(
            source = %origin,
            count = parsed.rules.len(),
            rejected = parsed.rejected.len(),
            "Loaded rule document"
        );
        self.rules.extend(parsed.rules);
        self.rejected.extend(parsed.rejected);
        Ok(self)
    }

    /// Append the rules of a file on disk.
    pub fn add_file(&mut self, path: impl AsRef<Path>) -> RuleResult<&mut Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| RuleError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        self.add_str(&content, RuleSource::File(path.to_path_buf()))
    }

    /// Append rules built in code.
    pub fn add_rules(&mut self, rules: impl IntoIterator<Item = Rule>) -> &mut Self {
        self.rules.extend(rules);
        self
    }

    /// Rules dropped so far under [`LoadPolicy::Skip`].
    pub fn rejected(&self) -> &[RuleError] {
        &self.rejected
    }

    /// Finish, returning the rule set and every rejected rule.
    pub fn finish(self) -> (RuleSet, Vec<RuleError>) {
        info!(
            rules = self.rules.len(),
            rejected = self.rejected.len(),
            "Rule set assembled"
        );
        (RuleSet::new(self.rules), self.rejected)
    }

    pub fn build(self) -> RuleSet {
        self.finish().0
    }
}

impl RuleSet {
    /// Parse a single YAML/JSON document, aborting on the first malformed rule.
    pub fn from_yaml_str(content: &str, factories: &FactoryRegistry) -> RuleResult<Self> {
        let mut builder = RuleSetBuilder::new(factories);
        builder.add_str(content, RuleSource::Inline)?;
        Ok(builder.build())
    }

    /// Load a single rule file, aborting on the first malformed rule.
    pub fn load_file(path: impl AsRef<Path>, factories: &FactoryRegistry) -> RuleResult<Self> {
        let mut builder = RuleSetBuilder::new(factories);
        builder.add_file(path)?;
        Ok(builder.build())
    }

    /// The embedded default rules with the built-in factories.
    pub fn builtin() -> RuleResult<Self> {
        let factories = FactoryRegistry::with_builtins();
        let mut builder = RuleSetBuilder::new(&factories);
        builder.add_builtin()?;
        Ok(builder.build())
    }
}
