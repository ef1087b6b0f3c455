mod common;

use std::sync::Arc;

use common::{pump_schema, FixedContext, ScriptedClassifier};
use datasheet_recon_lib::{
    core::{
        config::ResolverConfig,
        types::{RawTable, ResolutionSource},
    },
    mapper::{CanonicalStore, Resolver, TableIngestor},
};
use tokio::sync::Mutex;

fn table(value: serde_json::Value) -> RawTable {
    serde_json::from_value(value).expect("table")
}

fn ingestor(classifier: Arc<ScriptedClassifier>, context: Arc<FixedContext>) -> TableIngestor {
    let resolver = Resolver::new(pump_schema(), classifier, context, ResolverConfig::default());
    TableIngestor::new(Arc::new(resolver))
}

fn store() -> Mutex<CanonicalStore> {
    Mutex::new(CanonicalStore::new(pump_schema()))
}

#[tokio::test]
async fn columnar_subparts_table_maps_tag_to_equipment_tag() {
    let classifier = Arc::new(ScriptedClassifier::new(&[("header 'Tag'", "equipmentTag")]));
    let ingestor = ingestor(classifier.clone(), Arc::new(FixedContext::default()));
    let store = store();

    let report = ingestor
        .ingest_table(
            &table(serde_json::json!({
                "table_name": "Subparts",
                "column_names": ["Tag"],
                "data": [{"Tag": "E-101"}]
            })),
            &store,
        )
        .await;

    assert_eq!(report.entity, "subparts");
    assert_eq!(report.entity_source, ResolutionSource::Exact);
    assert_eq!(report.rows_written, 1);
    assert_eq!(report.resolutions[0].source, ResolutionSource::Classifier);
    assert_eq!(
        store.into_inner().into_tree()["subparts"],
        serde_json::json!([{"equipmentTag": "E-101"}])
    );
}

#[tokio::test]
async fn row_style_table_walks_every_fallback() {
    let classifier = Arc::new(ScriptedClassifier::new(&[
        ("Table name: Design Data", "designConditions"),
        ("Header 'NPSHr' context", "npshRequired"),
    ]));
    let context = Arc::new(FixedContext::new("NPSHr is the net positive suction head required."));
    let ingestor = ingestor(classifier.clone(), context.clone());
    let store = store();

    let report = ingestor
        .ingest_table(
            &table(serde_json::json!({
                "table_name": "Design Data",
                "column_names": ["Property", "Unit", "Value"],
                "data": [
                    {"Property": "Design Press.", "Unit": "barg", "Value": "10"},
                    {"Property": "Design Temperature", "Unit": "C", "Value": "120"},
                    {"Property": "NPSHr", "Unit": "m", "Value": "3.2"},
                    {"Property": "Jacket", "Unit": "", "Value": "none"},
                    {"Property": "", "Unit": "", "Value": "orphan"}
                ]
            })),
            &store,
        )
        .await;

    assert_eq!(report.entity, "designConditions");
    assert_eq!(report.entity_source, ResolutionSource::Classifier);
    assert_eq!(report.rows_written, 4);
    let sources: Vec<ResolutionSource> = report.resolutions.iter().map(|r| r.source).collect();
    assert_eq!(
        sources,
        vec![
            ResolutionSource::Alias,
            ResolutionSource::Exact,
            ResolutionSource::ClassifierWithContext,
            ResolutionSource::Synthesized,
        ]
    );
    assert!(!report.resolutions[3].matched);
    assert_eq!(context.calls(), 2);

    assert_eq!(
        store.into_inner().into_tree()["designConditions"],
        serde_json::json!({
            "designPressure": "10",
            "designTemperature": "120",
            "npshRequired": "3.2",
            "additional_properties": {"jacket": "none"}
        })
    );
}

#[tokio::test]
async fn classifier_failures_fall_back_to_others_without_erroring() {
    let classifier = Arc::new(ScriptedClassifier::failing());
    let ingestor = ingestor(classifier.clone(), Arc::new(FixedContext::default()));
    let store = store();

    let report = ingestor
        .ingest_table(
            &table(serde_json::json!({
                "table_name": "Pump Curve",
                "column_names": ["Flow Rate", "Head"],
                "data": [{"Flow Rate": "12", "Head": "40"}]
            })),
            &store,
        )
        .await;

    assert_eq!(report.entity, "others");
    assert_eq!(report.entity_source, ResolutionSource::Fallback);
    assert_eq!(classifier.calls(), 1);
    assert_eq!(
        store.into_inner().into_tree()["others"],
        serde_json::json!([{
            "entity": "others",
            "prop": null,
            "value": {"flow_rate": "12", "head": "40"}
        }])
    );
}

#[tokio::test]
async fn answers_outside_the_allow_list_are_rejected() {
    let classifier = Arc::new(ScriptedClassifier::new(&[("Table name: Pump Curve", "pumpCurve")]));
    let ingestor = ingestor(classifier, Arc::new(FixedContext::default()));

    let resolution = ingestor
        .resolver()
        .resolve_entity(&table(serde_json::json!({"table_name": "Pump Curve"})))
        .await;

    assert_eq!(resolution.entity, "others");
    assert_eq!(resolution.source, ResolutionSource::Fallback);
}

#[tokio::test]
async fn repeated_questions_are_served_from_the_session_cache() {
    let classifier = Arc::new(ScriptedClassifier::new(&[("header 'Item'", "equipmentTag")]));
    let ingestor = ingestor(classifier.clone(), Arc::new(FixedContext::default()));
    let store = store();

    for name in ["Equipments", "equipments"] {
        ingestor
            .ingest_table(
                &table(serde_json::json!({
                    "table_name": name,
                    "column_names": ["Item"],
                    "data": [{"Item": "P-101"}]
                })),
                &store,
            )
            .await;
    }

    assert_eq!(classifier.calls(), 1);
    let (hits, _) = ingestor.resolver().cache_stats();
    assert_eq!(hits, 1);
    assert_eq!(
        store.into_inner().into_tree()["equipments"],
        serde_json::json!([{"equipmentTag": "P-101"}, {"equipmentTag": "P-101"}])
    );
}

#[tokio::test]
async fn concurrent_ingestion_keeps_every_row() {
    let ingestor = ingestor(
        Arc::new(ScriptedClassifier::default()),
        Arc::new(FixedContext::default()),
    );
    let store = store();
    let tables: Vec<RawTable> = (0..4)
        .map(|batch| {
            table(serde_json::json!({
                "table_name": "Nozzles",
                "column_names": ["Nozzle Mark", "Size"],
                "data": [
                    {"Nozzle Mark": format!("N{batch}a"), "Size": "4"},
                    {"Nozzle Mark": format!("N{batch}b"), "Size": "2"}
                ]
            }))
        })
        .collect();

    let reports = ingestor.ingest_all(&tables, &store).await;

    assert_eq!(reports.len(), 4);
    assert!(reports.iter().all(|report| report.rows_written == 2));
    let tree = store.into_inner().into_tree();
    let nozzles = tree["nozzles"].as_array().expect("nozzles");
    assert_eq!(nozzles.len(), 8);
    assert!(nozzles.iter().all(|item| item.get("nozzleMark").is_some() && item.get("size").is_some()));
}
