use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::{config::GraphConfig, types::CanonicalTree};
use crate::graph::{field_text, instances, instances_mut, UUID_FIELD};
use crate::schema::SchemaSpec;

#[derive(Debug, Clone)]
pub struct IdentityLinker {
    schema: Arc<SchemaSpec>,
    config: GraphConfig,
}

impl IdentityLinker {
    pub fn new(schema: Arc<SchemaSpec>, config: GraphConfig) -> Self {
        Self { schema, config }
    }

    /// Runs every linking step. Returns the root uuid when one exists.
    pub fn link_all(&self, tree: &mut CanonicalTree, document_id: Option<&str>) -> Option<String> {
        let root = self.assign_uuids(tree, document_id);
        self.link_root(tree);
        self.link_equipment(tree);
        self.link_subparts(tree);
        root
    }

    /// The root object takes `document_id` (or a fresh uuid); other instances
    /// without a `uuid` get a fresh one. Existing uuids are kept.
    pub fn assign_uuids(&self, tree: &mut CanonicalTree, document_id: Option<&str>) -> Option<String> {
        let root_uuid = self.assign_root(tree, document_id);

        let mut assigned = 0usize;
        for entity in self.member_entities() {
            for item in instances_mut(tree, &entity) {
                if item.get(UUID_FIELD).and_then(scalar_text).is_none() {
                    item.insert(UUID_FIELD.to_string(), Value::String(Uuid::new_v4().to_string()));
                    assigned += 1;
                }
            }
        }
        debug!(assigned, "instance uuids assigned");
        root_uuid
    }

    fn assign_root(&self, tree: &mut CanonicalTree, document_id: Option<&str>) -> Option<String> {
        let root = self.config.root_entity.as_str();
        if !self.schema.declares(root) && !tree.contains_key(root) {
            return None;
        }

        let slot = tree
            .entry(root.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if matches!(slot, Value::Array(items) if items.is_empty()) {
            *slot = Value::Object(Map::new());
        }
        let Some(object) = slot.as_object_mut() else {
            warn!(entity = root, "root entity is not an object; no document uuid assigned");
            return None;
        };

        let uuid = match document_id {
            Some(id) if !id.trim().is_empty() => id.trim().to_string(),
            _ => match object.get(UUID_FIELD).and_then(Value::as_str) {
                Some(existing) if !existing.trim().is_empty() => existing.to_string(),
                _ => Uuid::new_v4().to_string(),
            },
        };
        object.insert(UUID_FIELD.to_string(), Value::String(uuid.clone()));
        info!(entity = root, uuid = %uuid, "document uuid assigned");
        Some(uuid)
    }

    /// Points every non-root instance at the root uuid.
    pub fn link_root(&self, tree: &mut CanonicalTree) {
        let root = self.config.root_entity.as_str();
        let Some(root_uuid) = instances(tree, root)
            .first()
            .and_then(|item| field_text(item, UUID_FIELD))
            .map(|uuid| uuid.into_owned())
        else {
            return;
        };

        let field = self.config.root_link_field.clone();
        for entity in self.member_entities() {
            for item in instances_mut(tree, &entity) {
                item.insert(field.clone(), Value::String(root_uuid.clone()));
            }
        }
    }

    /// Sets the equipment link on instances whose tag and discriminators
    /// name a known equipment.
    pub fn link_equipment(&self, tree: &mut CanonicalTree) {
        let equipment = self.config.equipment_entity.as_str();
        let key_fields = self.config.equipment_key_fields();
        let by_key = uuid_index(tree, equipment, &key_fields);
        if by_key.is_empty() {
            return;
        }

        let mut linked = 0usize;
        for entity in self.member_entities() {
            if entity == equipment {
                continue;
            }
            for item in instances_mut(tree, &entity) {
                if let Some(uuid) = link_key(item, &key_fields).and_then(|key| by_key.get(&key)) {
                    item.insert(
                        self.config.equipment_link_field.clone(),
                        Value::String(uuid.clone()),
                    );
                    linked += 1;
                }
            }
        }
        debug!(linked, "equipment links set");
    }

    /// Sets the subpart link on nozzles whose subpart name is known.
    pub fn link_subparts(&self, tree: &mut CanonicalTree) {
        let name_field = [self.config.subpart_name_field.as_str()];
        let by_name = uuid_index(tree, &self.config.subpart_entity, &name_field);
        if by_name.is_empty() {
            return;
        }

        let mut linked = 0usize;
        for item in instances_mut(tree, &self.config.nozzle_entity) {
            if let Some(uuid) = link_key(item, &name_field).and_then(|key| by_name.get(&key)) {
                item.insert(
                    self.config.subpart_link_field.clone(),
                    Value::String(uuid.clone()),
                );
                linked += 1;
            }
        }
        debug!(linked, "subpart links set");
    }

    fn member_entities(&self) -> Vec<String> {
        self.schema
            .entity_names()
            .iter()
            .filter(|entity| **entity != self.config.root_entity)
            .cloned()
            .collect()
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

type LinkKey = Vec<Option<String>>;

/// Values of `fields` on `item`; `None` unless the first field is present.
fn link_key(item: &Map<String, Value>, fields: &[&str]) -> Option<LinkKey> {
    let key: LinkKey = fields
        .iter()
        .map(|field| item.get(*field).and_then(scalar_text))
        .collect();
    key.first()?.as_ref()?;
    Some(key)
}

/// `link key -> uuid` over the instances of `entity`. First instance wins on
/// duplicate keys.
fn uuid_index(tree: &CanonicalTree, entity: &str, fields: &[&str]) -> HashMap<LinkKey, String> {
    let mut index = HashMap::new();
    for item in instances(tree, entity) {
        let key = item.as_object().and_then(|map| link_key(map, fields));
        let uuid = field_text(item, UUID_FIELD);
        if let (Some(key), Some(uuid)) = (key, uuid) {
            index.entry(key).or_insert_with(|| uuid.into_owned());
        }
    }
    index
}
