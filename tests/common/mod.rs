#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use datasheet_recon_lib::{
    core::errors::{AppError, AppResult},
    providers::{Classifier, ContextProvider},
    schema::SchemaSpec,
};

/// Answers with the first scripted choice whose needle occurs in the question.
#[derive(Default)]
pub struct ScriptedClassifier {
    answers: Vec<(String, String)>,
    calls: AtomicUsize,
    questions: Mutex<Vec<String>>,
    fail: bool,
}

impl ScriptedClassifier {
    pub fn new(answers: &[(&str, &str)]) -> Self {
        Self {
            answers: answers
                .iter()
                .map(|(needle, answer)| (needle.to_string(), answer.to_string()))
                .collect(),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().expect("questions").clone()
    }
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    async fn choose(&self, question: &str, _allow: &[String]) -> AppResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.questions
            .lock()
            .expect("questions")
            .push(question.to_string());
        if self.fail {
            return Err(AppError::ProviderRateLimited);
        }
        Ok(self
            .answers
            .iter()
            .find(|(needle, _)| question.contains(needle.as_str()))
            .map(|(_, answer)| answer.clone())
            .unwrap_or_else(|| "NONE".to_string()))
    }
}

/// Returns a fixed snippet, or fails when none is set.
#[derive(Default)]
pub struct FixedContext {
    text: Option<String>,
    calls: AtomicUsize,
}

impl FixedContext {
    pub fn new(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContextProvider for FixedContext {
    async fn context_for(&self, query: &str) -> AppResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.text
            .clone()
            .ok_or_else(|| AppError::Network(format!("offline: {query}")))
    }
}

pub fn pump_schema() -> Arc<SchemaSpec> {
    let schema = SchemaSpec::from_value(&serde_json::json!({
        "metaData": {"type": "object", "properties": {"documentTitle": {}, "revision": {}}},
        "equipments": {
            "type": "array",
            "aliases": ["Equipment List"],
            "items": {"properties": {"equipmentTag": {}, "equipmentType": {}}}
        },
        "subparts": {
            "type": "array",
            "items": {"properties": {"equipmentTag": {}, "subpartName": {}}}
        },
        "nozzles": {
            "type": "array",
            "items": {"properties": {"nozzleMark": {}, "size": {}, "equipmentTag": {}, "subpartName": {}}}
        },
        "designConditions": {
            "type": "object",
            "properties": {
                "designPressure": {"aliases": ["Design Press."]},
                "designTemperature": {},
                "npshRequired": {}
            }
        }
    }))
    .expect("schema");
    Arc::new(schema)
}
