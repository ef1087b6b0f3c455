use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use crate::core::types::CanonicalTree;
use crate::schema::{EntitySpec, SchemaSpec, OTHERS_ENTITY};

pub const OTHERS_KEY: &str = OTHERS_ENTITY;
pub const ADDITIONAL_PROPERTIES_KEY: &str = "additional_properties";
pub const BARE_VALUE_KEY: &str = "__value__";

/// Where a single write ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteTarget {
    Others,
    ArrayItem,
    Property,
    AdditionalProperty,
    Row,
}

/// Incrementally built canonical tree. Writes never fail and never drop data.
#[derive(Debug, Clone)]
pub struct CanonicalStore {
    schema: Arc<SchemaSpec>,
    data: CanonicalTree,
}

impl CanonicalStore {
    pub fn new(schema: Arc<SchemaSpec>) -> Self {
        Self {
            schema,
            data: Map::new(),
        }
    }

    pub fn schema(&self) -> &SchemaSpec {
        &self.schema
    }

    pub fn tree(&self) -> &CanonicalTree {
        &self.data
    }

    pub fn into_tree(self) -> CanonicalTree {
        self.data
    }

    pub fn write(&mut self, entity: &str, prop: Option<&str>, value: Value) -> WriteTarget {
        let target = match self.schema.entity(entity) {
            None => {
                let mut record = Map::new();
                record.insert("entity".to_string(), Value::String(entity.to_string()));
                record.insert(
                    "prop".to_string(),
                    prop.map(|name| Value::String(name.to_string()))
                        .unwrap_or(Value::Null),
                );
                record.insert("value".to_string(), value);
                array_slot(&mut self.data, OTHERS_KEY).push(Value::Object(record));
                WriteTarget::Others
            }
            Some(EntitySpec::Array { .. }) => {
                let item = match value {
                    Value::Object(row) => Value::Object(row),
                    scalar => {
                        let mut wrapped = Map::new();
                        wrapped.insert(prop.unwrap_or(BARE_VALUE_KEY).to_string(), scalar);
                        Value::Object(wrapped)
                    }
                };
                array_slot(&mut self.data, entity).push(item);
                WriteTarget::ArrayItem
            }
            Some(spec @ EntitySpec::Object { .. }) => {
                let object = object_slot(&mut self.data, entity);
                match (prop, value) {
                    (Some(name), value) if spec.declares(name) => {
                        object.insert(name.to_string(), value);
                        WriteTarget::Property
                    }
                    (Some(name), value) => {
                        additional_slot(object).insert(name.to_string(), value);
                        WriteTarget::AdditionalProperty
                    }
                    (None, Value::Object(row)) => {
                        for (key, cell) in row {
                            if spec.declares(&key) {
                                object.insert(key, cell);
                            } else {
                                additional_slot(object).insert(key, cell);
                            }
                        }
                        WriteTarget::Row
                    }
                    (None, scalar) => {
                        additional_slot(object).insert(BARE_VALUE_KEY.to_string(), scalar);
                        WriteTarget::AdditionalProperty
                    }
                }
            }
        };
        debug!(entity, prop = prop.unwrap_or("-"), ?target, "canonical write");
        target
    }
}

fn array_slot<'a>(data: &'a mut CanonicalTree, key: &str) -> &'a mut Vec<Value> {
    let slot = data
        .entry(key.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    if !slot.is_array() {
        let previous = std::mem::take(slot);
        *slot = Value::Array(vec![previous]);
    }
    match slot {
        Value::Array(items) => items,
        _ => unreachable!("slot was just made an array"),
    }
}

fn object_slot<'a>(data: &'a mut CanonicalTree, key: &str) -> &'a mut Map<String, Value> {
    let slot = data
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    match slot {
        Value::Object(map) => map,
        _ => unreachable!("slot was just made an object"),
    }
}

fn additional_slot(object: &mut Map<String, Value>) -> &mut Map<String, Value> {
    let slot = object
        .entry(ADDITIONAL_PROPERTIES_KEY.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        let previous = std::mem::take(slot);
        let mut map = Map::new();
        map.insert(BARE_VALUE_KEY.to_string(), previous);
        *slot = Value::Object(map);
    }
    match slot {
        Value::Object(map) => map,
        _ => unreachable!("slot was just made an object"),
    }
}
