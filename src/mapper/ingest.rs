use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::core::types::{RawTable, ResolutionRecord, TableReport};
use crate::mapper::{
    resolver::{synthesize_property, Resolver},
    store::CanonicalStore,
};

const PROPERTY_COLUMNS: [&str; 2] = ["Standard Property", "Property"];
const VALUE_COLUMN: &str = "Value";

/// Layout of a raw table, decided from its column names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableLayout {
    /// One property per row: `property_column` names it, `value_column` holds it.
    Rows {
        property_column: String,
        value_column: String,
    },
    /// One instance per row, one property per column.
    Columns { headers: Vec<String> },
}

impl TableLayout {
    pub fn detect(table: &RawTable) -> Self {
        let columns = column_names(table);
        let property_column = PROPERTY_COLUMNS
            .iter()
            .find(|name| columns.iter().any(|column| column == *name));

        match property_column {
            Some(property_column) => {
                let value_column = if columns.iter().any(|column| column == VALUE_COLUMN) {
                    VALUE_COLUMN.to_string()
                } else {
                    columns.last().cloned().unwrap_or_default()
                };
                Self::Rows {
                    property_column: property_column.to_string(),
                    value_column,
                }
            }
            None => Self::Columns { headers: columns },
        }
    }
}

/// Declared column names, or the keys of the data rows in first-seen order
/// when the table carries none.
fn column_names(table: &RawTable) -> Vec<String> {
    if !table.column_names.is_empty() {
        return table.column_names.clone();
    }
    let mut names: Vec<String> = vec![];
    for row in &table.data {
        for key in row.keys() {
            if !names.contains(key) {
                names.push(key.clone());
            }
        }
    }
    names
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.trim().to_string(),
        Some(other) => other.to_string(),
    }
}

pub struct TableIngestor {
    resolver: Arc<Resolver>,
}

impl TableIngestor {
    pub fn new(resolver: Arc<Resolver>) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &Arc<Resolver> {
        &self.resolver
    }

    /// Ingests every table concurrently. Returns once all writes are done.
    pub async fn ingest_all(
        &self,
        tables: &[RawTable],
        store: &Mutex<CanonicalStore>,
    ) -> Vec<TableReport> {
        join_all(tables.iter().map(|table| self.ingest_table(table, store))).await
    }

    pub async fn ingest_table(&self, table: &RawTable, store: &Mutex<CanonicalStore>) -> TableReport {
        let resolution = self.resolver.resolve_entity(table).await;
        let entity = resolution.entity.as_str();
        info!(
            table = %table.table_name,
            entity,
            source = resolution.source.as_str(),
            "table resolved"
        );

        let layout = TableLayout::detect(table);
        let (resolutions, rows_written) = match layout {
            TableLayout::Rows {
                property_column,
                value_column,
            } => {
                self.ingest_rows(table, entity, &property_column, &value_column, store)
                    .await
            }
            TableLayout::Columns { headers } => {
                self.ingest_columns(table, entity, &headers, store).await
            }
        };

        TableReport {
            table_name: table.table_name.clone(),
            entity: resolution.entity.clone(),
            entity_source: resolution.source,
            rows_written,
            resolutions,
        }
    }

    async fn ingest_rows(
        &self,
        table: &RawTable,
        entity: &str,
        property_column: &str,
        value_column: &str,
        store: &Mutex<CanonicalStore>,
    ) -> (Vec<ResolutionRecord>, usize) {
        let mut resolutions = vec![];
        let mut written = 0;
        for row in &table.data {
            let raw = cell_text(row.get(property_column));
            if raw.is_empty() {
                continue;
            }
            let value = row
                .get(value_column)
                .cloned()
                .unwrap_or_else(|| Value::String(String::new()));

            let record = self.resolver.resolve_property(entity, &raw).await;
            store
                .lock()
                .await
                .write(entity, Some(&record.property), value);
            written += 1;
            resolutions.push(record);
        }
        debug!(table = %table.table_name, written, "row-style table ingested");
        (resolutions, written)
    }

    async fn ingest_columns(
        &self,
        table: &RawTable,
        entity: &str,
        headers: &[String],
        store: &Mutex<CanonicalStore>,
    ) -> (Vec<ResolutionRecord>, usize) {
        let resolutions = join_all(
            headers
                .iter()
                .map(|header| self.resolver.resolve_property(entity, header)),
        )
        .await;
        let header_map: HashMap<&str, &str> = resolutions
            .iter()
            .map(|record| (record.raw.as_str(), record.property.as_str()))
            .collect();

        let mapped_rows: Vec<Value> = table
            .data
            .iter()
            .map(|row| {
                let mut mapped = Map::new();
                for (key, value) in row {
                    let property = match header_map.get(key.as_str()) {
                        Some(property) => (*property).to_string(),
                        None => synthesize_property(key),
                    };
                    mapped.insert(property, value.clone());
                }
                Value::Object(mapped)
            })
            .collect();

        let written = mapped_rows.len();
        for row in mapped_rows {
            store.lock().await.write(entity, None, row);
        }
        debug!(table = %table.table_name, written, "columnar table ingested");
        (resolutions, written)
    }
}
