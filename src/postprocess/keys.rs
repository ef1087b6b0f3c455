use serde_json::{Map, Value};

use crate::core::types::CanonicalTree;

/// `design_pressure` becomes `designPressure`. Keys starting with `_` are
/// kept as they are.
pub fn to_camel_case(key: &str) -> String {
    if key.starts_with('_') || !key.contains('_') {
        return key.to_string();
    }
    let mut parts = key.split('_');
    let mut out = parts.next().unwrap_or_default().to_string();
    for part in parts {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(&chars.as_str().to_lowercase());
        }
    }
    out
}

/// Rewrites every key below the entity level. Entity names stay untouched.
pub fn camel_case_keys(tree: &mut CanonicalTree) {
    for value in tree.values_mut() {
        let taken = std::mem::take(value);
        *value = convert(taken);
    }
}

fn convert(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::new();
            for (key, item) in map {
                out.insert(to_camel_case(&key), convert(item));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(convert).collect()),
        other => other,
    }
}
