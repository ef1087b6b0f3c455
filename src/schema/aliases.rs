use std::collections::HashMap;

use crate::schema::spec::SchemaSpec;

/// Upper-cases and drops everything that is not an ASCII letter or digit.
pub fn normalize_key(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|value| value.to_ascii_uppercase())
        .collect()
}

/// Normalized alias lookups declared in the schema.
#[derive(Debug, Clone, Default)]
pub struct AliasIndex {
    entities: HashMap<String, String>,
    properties: HashMap<String, HashMap<String, String>>,
}

impl AliasIndex {
    pub fn build(schema: &SchemaSpec) -> Self {
        let mut index = Self::default();
        for (entity, spec) in schema.iter() {
            for alias in spec.aliases() {
                let key = normalize_key(alias);
                if !key.is_empty() {
                    index.entities.entry(key).or_insert_with(|| entity.to_string());
                }
            }
            let by_entity = index.properties.entry(entity.to_string()).or_default();
            for (property, prop_spec) in spec.properties().iter() {
                for alias in &prop_spec.aliases {
                    let key = normalize_key(alias);
                    if !key.is_empty() {
                        by_entity.entry(key).or_insert_with(|| property.to_string());
                    }
                }
            }
        }
        index
    }

    pub fn entity(&self, normalized: &str) -> Option<&str> {
        self.entities.get(normalized).map(String::as_str)
    }

    pub fn property(&self, entity: &str, normalized: &str) -> Option<&str> {
        self.properties
            .get(entity)
            .and_then(|by_key| by_key.get(normalized))
            .map(String::as_str)
    }
}
