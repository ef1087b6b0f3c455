use std::{collections::HashMap, path::Path};

use serde_json::{Map, Value};

use crate::core::{
    errors::{AppError, AppResult},
    types::ResolutionSource,
};
use crate::schema::aliases::{normalize_key, AliasIndex};

/// Entity that collects writes aimed at undeclared entities.
pub const OTHERS_ENTITY: &str = "others";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PropSpec {
    pub aliases: Vec<String>,
    pub extra: Map<String, Value>,
}

/// Declared properties in document order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PropertySet {
    order: Vec<String>,
    specs: HashMap<String, PropSpec>,
}

impl PropertySet {
    pub fn names(&self) -> &[String] {
        &self.order
    }

    pub fn get(&self, name: &str) -> Option<&PropSpec> {
        self.specs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.specs.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropSpec)> {
        self.order
            .iter()
            .filter_map(|name| self.specs.get(name).map(|spec| (name.as_str(), spec)))
    }

    fn insert(&mut self, name: String, spec: PropSpec) {
        if !self.specs.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.specs.insert(name, spec);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntitySpec {
    Object {
        properties: PropertySet,
        aliases: Vec<String>,
    },
    Array {
        item_properties: PropertySet,
        aliases: Vec<String>,
    },
}

impl EntitySpec {
    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array { .. })
    }

    pub fn properties(&self) -> &PropertySet {
        match self {
            Self::Object { properties, .. } => properties,
            Self::Array {
                item_properties, ..
            } => item_properties,
        }
    }

    pub fn property_names(&self) -> &[String] {
        self.properties().names()
    }

    pub fn declares(&self, property: &str) -> bool {
        self.properties().contains(property)
    }

    pub fn aliases(&self) -> &[String] {
        match self {
            Self::Object { aliases, .. } | Self::Array { aliases, .. } => aliases,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SchemaSpec {
    order: Vec<String>,
    entities: HashMap<String, EntitySpec>,
    aliases: AliasIndex,
}

impl SchemaSpec {
    pub fn load(path: &Path) -> AppResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> AppResult<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(&value)
    }

    /// Accepts a bare entity map or a JSON-schema style document whose
    /// top-level `properties` holds the entity map.
    pub fn from_value(value: &Value) -> AppResult<Self> {
        let root = value
            .as_object()
            .ok_or_else(|| AppError::Schema("schema root must be an object".to_string()))?;
        let entities = unwrap_entity_map(root);

        let mut schema = Self::default();
        for (name, raw) in entities {
            let spec = parse_entity(name, raw)?;
            if name == OTHERS_ENTITY && !spec.is_array() {
                return Err(AppError::Schema(format!(
                    "entity '{OTHERS_ENTITY}' collects overflow records and must be an array"
                )));
            }
            schema.order.push(name.clone());
            schema.entities.insert(name.clone(), spec);
        }
        schema.aliases = AliasIndex::build(&schema);
        Ok(schema)
    }

    pub fn entity(&self, name: &str) -> Option<&EntitySpec> {
        self.entities.get(name)
    }

    pub fn declares(&self, name: &str) -> bool {
        self.entities.contains_key(name)
    }

    pub fn entity_names(&self) -> &[String] {
        &self.order
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &EntitySpec)> {
        self.order
            .iter()
            .filter_map(|name| self.entities.get(name).map(|spec| (name.as_str(), spec)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Deterministic lookup of a raw table name: normalized equality first,
    /// then declared entity aliases.
    pub fn match_entity(&self, raw: &str) -> Option<(&str, ResolutionSource)> {
        let key = normalize_key(raw);
        if key.is_empty() {
            return None;
        }
        if let Some(name) = self.order.iter().find(|name| normalize_key(name) == key) {
            return Some((name.as_str(), ResolutionSource::Exact));
        }
        self.aliases
            .entity(&key)
            .map(|name| (name, ResolutionSource::Alias))
    }

    /// Same as [`SchemaSpec::match_entity`] but against one entity's
    /// declared properties.
    pub fn match_property(&self, entity: &str, raw: &str) -> Option<(&str, ResolutionSource)> {
        let spec = self.entities.get(entity)?;
        let key = normalize_key(raw);
        if key.is_empty() {
            return None;
        }
        if let Some(name) = spec
            .property_names()
            .iter()
            .find(|name| normalize_key(name) == key)
        {
            return Some((name.as_str(), ResolutionSource::Exact));
        }
        self.aliases
            .property(entity, &key)
            .map(|name| (name, ResolutionSource::Alias))
    }
}

fn unwrap_entity_map(root: &Map<String, Value>) -> &Map<String, Value> {
    let Some(inner) = root.get("properties").and_then(Value::as_object) else {
        return root;
    };
    let wrapped = !inner.is_empty()
        && inner
            .values()
            .all(|value| value.get("type").and_then(Value::as_str).is_some());
    if wrapped {
        inner
    } else {
        root
    }
}

fn parse_entity(name: &str, raw: &Value) -> AppResult<EntitySpec> {
    let body = raw
        .as_object()
        .ok_or_else(|| AppError::Schema(format!("entity '{name}' must be an object")))?;
    let aliases = parse_aliases(body.get("aliases"));
    let kind = body
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::Schema(format!("entity '{name}' has no type")))?;

    match kind {
        "object" => Ok(EntitySpec::Object {
            properties: parse_properties(name, body.get("properties"))?,
            aliases,
        }),
        "array" => {
            let item_props = body
                .get("items")
                .and_then(|items| items.get("properties"))
                .or_else(|| body.get("properties"));
            Ok(EntitySpec::Array {
                item_properties: parse_properties(name, item_props)?,
                aliases,
            })
        }
        other => Err(AppError::Schema(format!(
            "entity '{name}' has unsupported type '{other}'"
        ))),
    }
}

fn parse_properties(entity: &str, raw: Option<&Value>) -> AppResult<PropertySet> {
    let mut set = PropertySet::default();
    let Some(raw) = raw else {
        return Ok(set);
    };
    let map = raw.as_object().ok_or_else(|| {
        AppError::Schema(format!("properties of entity '{entity}' must be an object"))
    })?;
    for (name, spec) in map {
        let body = spec.as_object().ok_or_else(|| {
            AppError::Schema(format!("property '{entity}.{name}' must be an object"))
        })?;
        let mut extra = body.clone();
        extra.remove("aliases");
        set.insert(
            name.clone(),
            PropSpec {
                aliases: parse_aliases(body.get("aliases")),
                extra,
            },
        );
    }
    Ok(set)
}

fn parse_aliases(raw: Option<&Value>) -> Vec<String> {
    raw.and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::{EntitySpec, SchemaSpec};
    use crate::core::types::ResolutionSource;

    fn sample() -> SchemaSpec {
        SchemaSpec::from_value(&serde_json::json!({
            "metaData": {"type": "object", "properties": {"documentNumber": {}}},
            "designConditions": {
                "type": "object",
                "aliases": ["DESIGN DATA"],
                "properties": {
                    "designPressure": {"type": "number", "aliases": ["Design Press."]},
                    "designTemperature": {}
                }
            },
            "subparts": {
                "type": "array",
                "items": {"properties": {"equipmentTag": {}, "subpartName": {}}}
            }
        }))
        .expect("schema parses")
    }

    #[test]
    fn parses_object_and_array_entities_in_declaration_order() {
        let schema = sample();
        assert_eq!(
            schema.entity_names(),
            &["metaData", "designConditions", "subparts"]
        );
        assert!(matches!(
            schema.entity("subparts"),
            Some(EntitySpec::Array { .. })
        ));
        assert_eq!(
            schema.entity("subparts").map(|spec| spec.property_names().to_vec()),
            Some(vec!["equipmentTag".to_string(), "subpartName".to_string()])
        );
        let pressure = schema
            .entity("designConditions")
            .and_then(|spec| spec.properties().get("designPressure"))
            .expect("declared");
        assert_eq!(pressure.extra["type"], "number");
    }

    #[test]
    fn unwraps_json_schema_style_documents() {
        let schema = SchemaSpec::from_value(&serde_json::json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "type": "object",
            "properties": {
                "nozzles": {"type": "array", "items": {"properties": {"size": {}}}}
            }
        }))
        .expect("schema parses");
        assert_eq!(schema.entity_names(), &["nozzles"]);
    }

    #[test]
    fn rejects_unknown_entity_type() {
        let err = SchemaSpec::from_value(&serde_json::json!({
            "notes": {"type": "string"}
        }))
        .expect_err("unsupported type");
        assert_eq!(err.code(), "SCHEMA_ERROR");
    }

    #[test]
    fn others_must_be_declared_as_an_array() {
        let err = SchemaSpec::from_value(&serde_json::json!({
            "others": {"type": "object", "properties": {"note": {}}}
        }))
        .expect_err("object others");
        assert_eq!(err.code(), "SCHEMA_ERROR");

        let schema = SchemaSpec::from_value(&serde_json::json!({
            "others": {"type": "array", "items": {"properties": {"note": {}}}}
        }))
        .expect("array others");
        assert!(schema.entity("others").is_some_and(|spec| spec.is_array()));
    }

    #[test]
    fn matches_entities_by_normalized_name_then_alias() {
        let schema = sample();
        assert_eq!(
            schema.match_entity("design-conditions"),
            Some(("designConditions", ResolutionSource::Exact))
        );
        assert_eq!(
            schema.match_entity("Design Data"),
            Some(("designConditions", ResolutionSource::Alias))
        );
        assert_eq!(schema.match_entity("Nozzle Schedule"), None);
    }

    #[test]
    fn matches_properties_within_one_entity() {
        let schema = sample();
        assert_eq!(
            schema.match_property("designConditions", "DESIGN PRESS"),
            Some(("designPressure", ResolutionSource::Alias))
        );
        assert_eq!(
            schema.match_property("designConditions", "Design Temperature"),
            Some(("designTemperature", ResolutionSource::Exact))
        );
        assert_eq!(schema.match_property("subparts", "Design Temperature"), None);
        assert_eq!(schema.match_property("others", "Tag"), None);
    }
}
