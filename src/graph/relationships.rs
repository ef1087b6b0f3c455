use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::core::{
    config::GraphConfig,
    errors::{AppError, AppResult},
    types::{CanonicalTree, Relationship},
};
use crate::graph::{field_text, instances, UUID_FIELD};
use crate::schema::SchemaSpec;

pub const HAS_NOZZLE: &str = "HAS_NOZZLE";
pub const PART_OF_EQUIPMENT: &str = "PART_OF_EQUIPMENT";
pub const PART_OF_SUBPART: &str = "PART_OF_SUBPART";

/// Builds typed edges between the instances of a fully merged tree.
///
/// Runs after every write for the document has completed and performs no
/// I/O. Edge order is fixed: container edges, equipment ownership edges,
/// then nozzle/subpart edges, each in schema declaration order.
#[derive(Debug, Clone)]
pub struct RelationshipGraphBuilder {
    schema: Arc<SchemaSpec>,
    config: GraphConfig,
}

impl RelationshipGraphBuilder {
    pub fn new(schema: Arc<SchemaSpec>, config: GraphConfig) -> Self {
        Self { schema, config }
    }

    /// Inserts an empty list for every declared entity the tree lacks.
    pub fn ensure_all_entities_present(&self, tree: &mut CanonicalTree) {
        for entity in self.schema.entity_names() {
            if !tree.contains_key(entity) {
                tree.insert(entity.clone(), Value::Array(vec![]));
            }
        }
    }

    pub fn generate_relationships(&self, tree: &CanonicalTree) -> AppResult<Vec<Relationship>> {
        let mut edges = vec![];
        let mut root_uuid: Option<String> = None;

        for entity in self.member_entities() {
            for (index, item) in instances(tree, entity).into_iter().enumerate() {
                let destination = item_uuid(entity, index, item)?;
                let source = match &root_uuid {
                    Some(uuid) => uuid.clone(),
                    None => {
                        let uuid = self.root_uuid(tree)?;
                        root_uuid = Some(uuid.clone());
                        uuid
                    }
                };
                edges.push(Relationship::new(
                    &source,
                    &destination,
                    format!("DESCRIBES_{}", entity.to_uppercase()),
                ));
            }
        }

        let owner_field = self.config.equipment_link_field.as_str();
        for entity in self.member_entities() {
            if entity == &self.config.equipment_entity {
                continue;
            }
            for (index, item) in instances(tree, entity).into_iter().enumerate() {
                let Some(owner) = field_text(item, owner_field) else {
                    continue;
                };
                let uuid = item_uuid(entity, index, item)?;
                edges.push(Relationship::new(
                    &owner,
                    &uuid,
                    format!("HAS_{}", entity.to_uppercase()),
                ));
                edges.push(Relationship::new(&uuid, &owner, PART_OF_EQUIPMENT));
            }
        }

        let nozzles = self.config.nozzle_entity.as_str();
        let subpart_field = self.config.subpart_link_field.as_str();
        for (index, item) in instances(tree, nozzles).into_iter().enumerate() {
            let Some(subpart) = field_text(item, subpart_field) else {
                continue;
            };
            let uuid = item_uuid(nozzles, index, item)?;
            edges.push(Relationship::new(&subpart, &uuid, HAS_NOZZLE));
            edges.push(Relationship::new(&uuid, &subpart, PART_OF_SUBPART));
        }

        info!(edges = edges.len(), "relationships generated");
        Ok(edges)
    }

    /// Removes root, equipment and subpart link fields from every instance,
    /// declared or not.
    pub fn clean_uuid(&self, tree: &mut CanonicalTree) {
        let fields = self.config.link_fields();
        let mut removed = 0usize;
        for value in tree.values_mut() {
            let items: Vec<&mut Value> = if value.is_object() {
                vec![value]
            } else if let Value::Array(items) = value {
                items.iter_mut().collect()
            } else {
                continue;
            };
            for item in items {
                if let Some(map) = item.as_object_mut() {
                    for field in fields {
                        if map.remove(field).is_some() {
                            removed += 1;
                        }
                    }
                }
            }
        }
        debug!(removed, "link fields removed");
    }

    fn member_entities(&self) -> impl Iterator<Item = &String> {
        self.schema
            .entity_names()
            .iter()
            .filter(|entity| **entity != self.config.root_entity)
    }

    fn root_uuid(&self, tree: &CanonicalTree) -> AppResult<String> {
        let root = self.config.root_entity.as_str();
        match instances(tree, root).first() {
            Some(item) => item_uuid(root, 0, item),
            None => Err(AppError::MissingUuid {
                entity: root.to_string(),
                index: 0,
            }),
        }
    }
}

fn item_uuid(entity: &str, index: usize, item: &Value) -> AppResult<String> {
    field_text(item, UUID_FIELD)
        .map(|uuid| uuid.into_owned())
        .ok_or_else(|| AppError::MissingUuid {
            entity: entity.to_string(),
            index,
        })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::RelationshipGraphBuilder;
    use crate::core::{config::GraphConfig, types::CanonicalTree};
    use crate::schema::SchemaSpec;

    fn builder() -> RelationshipGraphBuilder {
        let schema = SchemaSpec::from_value(&serde_json::json!({
            "metaData": {"type": "object", "properties": {"title": {}}},
            "equipments": {"type": "array", "items": {"properties": {"equipmentTag": {}}}},
            "designConditions": {"type": "object", "properties": {"designPressure": {}}}
        }))
        .expect("schema");
        RelationshipGraphBuilder::new(Arc::new(schema), GraphConfig::default())
    }

    fn tree(value: serde_json::Value) -> CanonicalTree {
        value.as_object().cloned().expect("object")
    }

    #[test]
    fn ensure_is_idempotent_and_keeps_existing_values() {
        let builder = builder();
        let mut data = tree(serde_json::json!({"designConditions": {"designPressure": 10}}));
        builder.ensure_all_entities_present(&mut data);
        let once = data.clone();
        builder.ensure_all_entities_present(&mut data);

        assert_eq!(data, once);
        assert_eq!(data["equipments"], serde_json::json!([]));
        assert_eq!(data["metaData"], serde_json::json!([]));
        assert_eq!(data["designConditions"]["designPressure"], 10);
    }

    #[test]
    fn object_entity_counts_as_one_instance() {
        let data = tree(serde_json::json!({
            "metaData": {"uuid": "doc"},
            "designConditions": {"uuid": "dc", "designPressure": 10},
            "equipments": []
        }));
        let edges = builder().generate_relationships(&data).expect("edges");
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].relationship_type, "DESCRIBES_DESIGNCONDITIONS");
        assert_eq!(edges[0].source_uuid, "doc");
    }

    #[test]
    fn root_uuid_only_required_with_members() {
        let data = tree(serde_json::json!({"metaData": {"title": "x"}, "equipments": []}));
        assert!(builder().generate_relationships(&data).expect("edges").is_empty());

        let data = tree(serde_json::json!({"equipments": [{"uuid": "e1"}]}));
        let err = builder().generate_relationships(&data).expect_err("root uuid");
        assert_eq!(err.code(), "MISSING_UUID");
    }

    #[test]
    fn clean_uuid_strips_link_fields_everywhere() {
        let mut data = tree(serde_json::json!({
            "equipments": [{"uuid": "e1", "dataSheetUuid": "doc"}],
            "designConditions": {"uuid": "dc", "equipmentUuid": "e1", "subpartUuid": "s1"},
            "others": [{"entity": "x", "prop": null, "value": 1, "dataSheetUuid": "doc"}]
        }));
        builder().clean_uuid(&mut data);
        assert_eq!(data["equipments"], serde_json::json!([{"uuid": "e1"}]));
        assert_eq!(data["designConditions"], serde_json::json!({"uuid": "dc"}));
        assert!(data["others"][0].get("dataSheetUuid").is_none());
    }
}
