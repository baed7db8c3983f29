//! Validation of rule documents.
//!
//! A document is either an array of rules or an object with a `rules` array.
//! Shape errors surface as [`RuleError::MalformedRule`] naming the offending
//! field; the [`LoadPolicy`] decides whether one bad rule sinks the whole set.

use super::factories::FactoryRegistry;
use super::types::{ApplyPayload, Patterns, Priority, Rule, Selector};
use crate::error::{RuleError, RuleResult, RuleSource};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

const RULE_KEYS: &[&str] = &["name", "priority", "select", "apply", "deps", "factory"];
const SELECT_KEYS: &[&str] = &["module", "application"];

/// What to do with a rule that fails validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadPolicy {
    /// Fail the whole document on the first malformed rule (default).
    #[default]
    Abort,
    /// Drop malformed rules with a warning and keep the rest.
    Skip,
}

impl std::str::FromStr for LoadPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "abort" => Ok(LoadPolicy::Abort),
            "skip" => Ok(LoadPolicy::Skip),
            _ => Err(format!("Invalid policy '{}'. Valid options: abort, skip", s)),
        }
    }
}

/// Rules accepted from a document plus the ones dropped under [`LoadPolicy::Skip`].
#[derive(Debug, Default)]
pub struct ParsedRules {
    pub rules: Vec<Rule>,
    pub rejected: Vec<RuleError>,
}

/// Parse a YAML (or JSON) rule document.
pub fn parse_rules_str(
    content: &str,
    origin: &RuleSource,
    factories: &FactoryRegistry,
    policy: LoadPolicy,
) -> RuleResult<ParsedRules> {
    if content.trim().is_empty() {
        return Ok(ParsedRules::default());
    }
    let parse_error = |message: String| RuleError::Parse {
        origin: origin.clone(),
        message,
    };
    let mut yaml: serde_yaml::Value =
        serde_yaml::from_str(content).map_err(|e| parse_error(e.to_string()))?;
    name_non_finite(&mut yaml);
    let doc = serde_json::to_value(&yaml).map_err(|e| parse_error(e.to_string()))?;
    parse_rules(&doc, origin, factories, policy)
}

/// Spell out YAML `.inf`, `-.inf` and `.nan`, which a JSON tree cannot hold.
fn name_non_finite(value: &mut serde_yaml::Value) {
    match value {
        serde_yaml::Value::Number(n) => {
            let name = match n.as_f64() {
                Some(f) if f == f64::INFINITY => "Infinity",
                Some(f) if f == f64::NEG_INFINITY => "-Infinity",
                Some(f) if f.is_nan() => "NaN",
                _ => return,
            };
            *value = serde_yaml::Value::String(name.to_string());
        }
        serde_yaml::Value::Sequence(items) => items.iter_mut().for_each(name_non_finite),
        serde_yaml::Value::Mapping(map) => map.values_mut().for_each(name_non_finite),
        serde_yaml::Value::Tagged(tagged) => name_non_finite(&mut tagged.value),
        _ => {}
    }
}

/// Validate every rule in `doc`.
pub fn parse_rules(
    doc: &Value,
    origin: &RuleSource,
    factories: &FactoryRegistry,
    policy: LoadPolicy,
) -> RuleResult<ParsedRules> {
    let entries = match doc {
        Value::Array(entries) => entries,
        Value::Object(map) => match map.get("rules") {
            Some(Value::Array(entries)) => entries,
            Some(_) => {
                return Err(RuleError::Parse {
                    origin: origin.clone(),
                    message: "`rules` must be a list".to_string(),
                });
            }
            None => {
                return Err(RuleError::Parse {
                    origin: origin.clone(),
                    message: "document has no `rules` list".to_string(),
                });
            }
        },
        // An empty YAML file deserializes to null
        Value::Null => return Ok(ParsedRules::default()),
        _ => {
            return Err(RuleError::Parse {
                origin: origin.clone(),
                message: "expected a list of rules or an object with `rules`".to_string(),
            });
        }
    };

    let mut parsed = ParsedRules::default();
    for (index, entry) in entries.iter().enumerate() {
        match parse_rule(entry, origin, index, factories) {
            Ok(rule) => parsed.rules.push(rule),
            Err(err) => match policy {
                LoadPolicy::Abort => return Err(err),
                LoadPolicy::Skip => {
                    warn!("Skipping {}", err);
                    parsed.rejected.push(err);
                }
            },
        }
    }
    Ok(parsed)
}

/// Validate a single rule object.
pub fn parse_rule(
    entry: &Value,
    origin: &RuleSource,
    index: usize,
    factories: &FactoryRegistry,
) -> RuleResult<Rule> {
    let malformed = |field: &str, reason: &str| RuleError::malformed(origin, index, field, reason);

    let Value::Object(map) = entry else {
        return Err(malformed("rule", "must be an object"));
    };
    if let Some(key) = map.keys().find(|k| !RULE_KEYS.contains(&k.as_str())) {
        return Err(malformed(key, "is not a recognized rule key"));
    }

    let priority = match map.get("priority") {
        None => Priority::DEFAULT,
        Some(value) => parse_priority(value).ok_or_else(|| {
            malformed("priority", "must be a number or \"Infinity\"/\"-Infinity\"")
        })?,
    };

    let select = match map.get("select") {
        Some(Value::Object(select)) => parse_selector(select).map_err(|(f, r)| malformed(&f, &r))?,
        Some(_) => return Err(malformed("select", "must be an object")),
        None => return Err(malformed("select", "is required")),
    };

    let apply = match (map.get("apply"), map.get("factory")) {
        (Some(_), Some(_)) => {
            return Err(malformed("apply", "cannot be combined with `factory`"));
        }
        (Some(Value::Object(payload)), None) => {
            if map.contains_key("deps") {
                return Err(malformed("deps", "is only allowed with `factory`"));
            }
            ApplyPayload::Static(payload.clone())
        }
        (Some(_), None) => return Err(malformed("apply", "must be an object")),
        (None, Some(Value::String(name))) => {
            let factory = factories
                .get(name)
                .ok_or_else(|| malformed("factory", &format!("names unknown factory '{}'", name)))?;
            let dependencies = match map.get("deps") {
                None => Vec::new(),
                Some(deps) => parse_string_list(deps)
                    .ok_or_else(|| malformed("deps", "must be a list of strings"))?,
            };
            ApplyPayload::Dynamic {
                dependencies,
                factory: factory.clone(),
            }
        }
        (None, Some(_)) => return Err(malformed("factory", "must be a string")),
        (None, None) => return Err(malformed("apply", "is required (or `factory`)")),
    };

    let mut rule = Rule::new(select, apply)
        .with_priority(priority)
        .with_origin(origin.clone());
    match map.get("name") {
        None => {}
        Some(Value::String(name)) => rule = rule.with_name(name.clone()),
        Some(_) => return Err(malformed("name", "must be a string")),
    }
    Ok(rule)
}

/// Numbers, or the spellings of infinity JSON and YAML users reach for.
pub fn parse_priority(value: &Value) -> Option<Priority> {
    match value {
        Value::Number(n) => n.as_f64().and_then(Priority::new),
        Value::String(s) => match s.trim() {
            "Infinity" | "+Infinity" | "inf" | "+inf" | ".inf" | "+.inf" => Some(Priority::INFINITY),
            "-Infinity" | "-inf" | "-.inf" => Priority::new(f64::NEG_INFINITY),
            _ => None,
        },
        _ => None,
    }
}

fn parse_selector(select: &Map<String, Value>) -> Result<Selector, (String, String)> {
    if let Some(key) = select.keys().find(|k| !SELECT_KEYS.contains(&k.as_str())) {
        return Err((
            format!("select.{}", key),
            "is not a recognized selector key".to_string(),
        ));
    }
    let module = match select.get("module") {
        Some(value) => parse_patterns(value).map_err(|reason| ("select.module".to_string(), reason))?,
        None => return Err(("select.module".to_string(), "is required".to_string())),
    };
    let application = match select.get("application") {
        // `application: null` reads the same as leaving it out
        None | Some(Value::Null) => None,
        Some(value) => Some(
            parse_patterns(value).map_err(|reason| ("select.application".to_string(), reason))?,
        ),
    };
    Ok(Selector {
        module,
        application,
    })
}

fn parse_patterns(value: &Value) -> Result<Patterns, String> {
    match value {
        Value::String(s) => Ok(Patterns::from(s.as_str())),
        Value::Array(_) => {
            let list = parse_string_list(value)
                .ok_or_else(|| "must contain only strings".to_string())?;
            if list.is_empty() {
                return Err("must name at least one pattern".to_string());
            }
            Ok(Patterns::from(list))
        }
        _ => Err("must be a string or a list of strings".to_string()),
    }
}

fn parse_string_list(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect()
}
