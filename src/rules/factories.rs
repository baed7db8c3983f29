//! Named factories backing dynamic `apply` payloads.
//!
//! Rule documents refer to factories by name (`factory: cartesian-axis-formatters`);
//! the registry maps those names to Rust functions when rules are loaded.

use super::types::Factory;
use crate::merge::{FUNCTION_REF_KEY, function_ref};
use serde_json::{Map, Value, json};
use std::collections::HashMap;

/// Locale used when the `environment` dependency does not name one.
pub const DEFAULT_LOCALE: &str = "en-US";

/// Lookup table from factory name to factory.
#[derive(Debug, Clone, Default)]
pub struct FactoryRegistry {
    factories: HashMap<String, Factory>,
}

impl FactoryRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the factories used by the embedded rules.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Factory::new(
            "cartesian-axis-formatters",
            cartesian_axis_formatters,
        ));
        registry.register(Factory::new("visual-key-validation", visual_key_validation));
        registry
    }

    /// Add a factory, returning the one it replaced.
    pub fn register(&mut self, factory: Factory) -> Option<Factory> {
        self.factories.insert(factory.name().to_string(), factory)
    }

    pub fn get(&self, name: &str) -> Option<&Factory> {
        self.factories.get(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Tick formatters for cartesian axes.
///
/// deps: `[environment]`, where `environment.locale` picks the date locale.
fn cartesian_axis_formatters(deps: &[Value]) -> Map<String, Value> {
    let locale = deps
        .first()
        .and_then(|env| env.get("locale"))
        .and_then(Value::as_str)
        .filter(|locale| !locale.is_empty())
        .unwrap_or(DEFAULT_LOCALE);

    let mut numeric = function_ref("abbreviatedNumber");
    numeric["abbreviateFrom"] = json!(1000);

    let mut time_series = function_ref("localizedDate");
    time_series["locale"] = json!(locale);
    time_series["day"] = json!({"year": "numeric", "month": "numeric", "day": "numeric"});
    time_series["month"] = json!({"year": "numeric", "month": "numeric"});

    let mut extension = Map::new();
    extension.insert("numericAxisTickFormatter".to_string(), numeric);
    extension.insert("timeSeriesAxisTickFormatter".to_string(), time_series);

    let mut payload = Map::new();
    payload.insert("extension".to_string(), Value::Object(extension));
    payload
}

/// Key-consistency validation for visual role mappings.
///
/// An optional first dependency overrides the reported error type.
fn visual_key_validation(deps: &[Value]) -> Map<String, Value> {
    let error_type = deps
        .first()
        .and_then(Value::as_str)
        .unwrap_or("ValidationError");

    let mut payload = Map::new();
    payload.insert(
        "validateOn".to_string(),
        json!({
            FUNCTION_REF_KEY: "visualKeyConsistency",
            "errorType": error_type,
            "message": "Visual role '{role}' cannot be mapped to non-key field '{field}'."
        }),
    );
    payload
}
