pub mod linkage;
pub mod relationships;

pub use linkage::IdentityLinker;
pub use relationships::RelationshipGraphBuilder;

use serde_json::{Map, Value};

use crate::core::types::CanonicalTree;

pub const UUID_FIELD: &str = "uuid";

/// Instances stored under `entity`: each list item, or the object itself
/// when it is a non-empty object.
pub(crate) fn instances<'a>(tree: &'a CanonicalTree, entity: &str) -> Vec<&'a Value> {
    match tree.get(entity) {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(value @ Value::Object(map)) if !map.is_empty() => vec![value],
        _ => vec![],
    }
}

pub(crate) fn instances_mut<'a>(
    tree: &'a mut CanonicalTree,
    entity: &str,
) -> Vec<&'a mut Map<String, Value>> {
    match tree.get_mut(entity) {
        Some(Value::Array(items)) => items.iter_mut().filter_map(Value::as_object_mut).collect(),
        Some(Value::Object(map)) if !map.is_empty() => vec![map],
        _ => vec![],
    }
}

/// Non-empty string form of a scalar field, used for uuid and tag lookups.
pub(crate) fn field_text<'a>(item: &'a Value, field: &str) -> Option<std::borrow::Cow<'a, str>> {
    match item.get(field)? {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().into()),
        Value::Number(number) => Some(number.to_string().into()),
        _ => None,
    }
}
