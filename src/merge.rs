//! Deep merge of configuration value trees.
//!
//! Shared by the rule resolver (merging `apply` payloads in priority order)
//! and the settings loader (merging tiers field-by-field).
//!
//! Plain objects merge recursively. Everything else replaces the existing
//! value outright: numbers, strings, booleans, `null`, arrays and function
//! references.

use serde_json::{Map, Value};

/// Key that marks an object as a function reference.
///
/// `{"$fn": "legendShapeColor"}` stands for a function bound by the renderer.
/// Extra keys on the same object are arguments to that function.
pub const FUNCTION_REF_KEY: &str = "$fn";

/// Build a function reference leaf with no arguments.
pub fn function_ref(name: &str) -> Value {
    let mut map = Map::new();
    map.insert(FUNCTION_REF_KEY.to_string(), Value::String(name.to_string()));
    Value::Object(map)
}

/// True if `value` is a function reference leaf.
pub fn is_function_ref(value: &Value) -> bool {
    matches!(value, Value::Object(map) if map.get(FUNCTION_REF_KEY).is_some_and(Value::is_string))
}

/// True if `value` merges key-by-key: an object that is not a function reference.
pub fn is_plain_object(value: &Value) -> bool {
    value.is_object() && !is_function_ref(value)
}

/// Deep merge two JSON values, with `overlay` taking precedence over `base`.
///
/// - Plain objects are merged recursively: keys in overlay override keys in base
/// - Arrays, strings, numbers, booleans, nulls and function references replace
///   the base value entirely
///
/// # Example
/// ```
/// use serde_json::json;
/// use viz_style_rules::merge::deep_merge;
///
/// let base = json!({
///     "extension": { "margins": 0, "paddings": 10 },
///     "legendItemPadding": { "left": 7.5 }
/// });
/// let overlay = json!({
///     "extension": { "paddings": 0 },
///     "legendItemPadding": [1, 2, 3]
/// });
/// let result = deep_merge(base, overlay);
/// assert_eq!(
///     result,
///     json!({
///         "extension": { "margins": 0, "paddings": 0 },
///         "legendItemPadding": [1, 2, 3]
///     })
/// );
/// ```
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    if !is_plain_object(&base) || !is_plain_object(&overlay) {
        return overlay;
    }
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            merge_maps(&mut base_map, overlay_map);
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Merge `overlay` into `base` in place, key by key.
pub fn merge_maps(base: &mut Map<String, Value>, overlay: Map<String, Value>) {
    for (key, overlay_value) in overlay {
        let merged_value = match base.remove(&key) {
            Some(base_value) => deep_merge(base_value, overlay_value),
            None => overlay_value,
        };
        base.insert(key, merged_value);
    }
}

/// Merge multiple values in order, with later values taking precedence.
///
/// Starts from an empty object, so the result is always an object when every
/// input is one.
pub fn deep_merge_all(values: impl IntoIterator<Item = Value>) -> Value {
    values
        .into_iter()
        .fold(Value::Object(Map::new()), deep_merge)
}
