//! Default rules compiled into the binary.

use super::factories::FactoryRegistry;
use super::parse::{LoadPolicy, parse_rules_str};
use super::types::Rule;
use crate::error::{RuleResult, RuleSource};

/// Default visual style rules, embedded at compile time.
pub const BUILTIN_RULES: &str = include_str!("../../config/rules.yaml");

/// Parse the embedded rules against `factories`.
///
/// Fails only if `factories` lacks one of the built-in factories.
pub fn builtin_rules(factories: &FactoryRegistry) -> RuleResult<Vec<Rule>> {
    parse_rules_str(BUILTIN_RULES, &RuleSource::Builtin, factories, LoadPolicy::Abort)
        .map(|parsed| parsed.rules)
}
