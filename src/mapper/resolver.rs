use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use crate::core::{
    config::ResolverConfig,
    types::{RawTable, ResolutionRecord, ResolutionSource},
};
use crate::mapper::{
    cache::ClassifierCache,
    prompts::{
        choice_prompt, context_query, enriched_property_question, entity_question,
        property_question,
    },
    store::OTHERS_KEY,
};
use crate::providers::{Classifier, ContextProvider};
use crate::schema::SchemaSpec;

const SAMPLE_ROWS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityResolution {
    pub entity: String,
    pub source: ResolutionSource,
}

pub struct Resolver {
    schema: Arc<SchemaSpec>,
    classifier: Arc<dyn Classifier>,
    context: Arc<dyn ContextProvider>,
    cache: Mutex<ClassifierCache>,
    config: ResolverConfig,
}

impl Resolver {
    pub fn new(
        schema: Arc<SchemaSpec>,
        classifier: Arc<dyn Classifier>,
        context: Arc<dyn ContextProvider>,
        config: ResolverConfig,
    ) -> Self {
        let cache = Mutex::new(ClassifierCache::new(config.cache_capacity));
        Self {
            schema,
            classifier,
            context,
            cache,
            config,
        }
    }

    pub fn schema(&self) -> &Arc<SchemaSpec> {
        &self.schema
    }

    /// `(hits, misses)` of the session cache.
    pub fn cache_stats(&self) -> (u64, u64) {
        self.cache
            .lock()
            .map(|cache| (cache.hits(), cache.misses()))
            .unwrap_or((0, 0))
    }

    pub async fn resolve_entity(&self, table: &RawTable) -> EntityResolution {
        if let Some((entity, source)) = self.schema.match_entity(&table.table_name) {
            return EntityResolution {
                entity: entity.to_string(),
                source,
            };
        }

        let allow = self.schema.entity_names().to_vec();
        if !allow.is_empty() {
            let sample = &table.data[..table.data.len().min(SAMPLE_ROWS)];
            let question = entity_question(&table.table_name, sample);
            if let Some(entity) = self.ask(&question, &allow, "entity").await {
                return EntityResolution {
                    entity,
                    source: ResolutionSource::Classifier,
                };
            }
        }

        EntityResolution {
            entity: OTHERS_KEY.to_string(),
            source: ResolutionSource::Fallback,
        }
    }

    pub async fn resolve_property(&self, entity: &str, raw: &str) -> ResolutionRecord {
        let record = |property: String, source: ResolutionSource| ResolutionRecord {
            raw: raw.to_string(),
            entity: entity.to_string(),
            property,
            matched: source.is_match(),
            source,
        };

        let resolved = match self.schema.entity(entity) {
            None => None,
            Some(spec) => match self.schema.match_property(entity, raw) {
                Some((property, source)) => Some((property.to_string(), source)),
                None => {
                    let allow = spec.property_names().to_vec();
                    self.classify_property(entity, raw, &allow).await
                }
            },
        };

        let result = match resolved {
            Some((property, source)) => record(property, source),
            None => record(synthesize_property(raw), ResolutionSource::Synthesized),
        };
        info!(
            raw,
            entity,
            property = %result.property,
            matched = result.matched,
            source = result.source.as_str(),
            "property resolved"
        );
        result
    }

    async fn classify_property(
        &self,
        entity: &str,
        raw: &str,
        allow: &[String],
    ) -> Option<(String, ResolutionSource)> {
        if allow.is_empty() {
            return None;
        }

        let question = property_question(raw, entity);
        if let Some(property) = self.ask(&question, allow, "property").await {
            return Some((property, ResolutionSource::Classifier));
        }

        if !self.config.enrich_with_context {
            return None;
        }
        let query = context_query(raw, &self.config.context_hint);
        match self.context.context_for(&query).await {
            Ok(context) => {
                let question = enriched_property_question(raw, entity, &context);
                self.ask(&question, allow, "property")
                    .await
                    .map(|property| (property, ResolutionSource::ClassifierWithContext))
            }
            Err(err) => {
                debug!(raw, error = %err, "context enrichment unavailable");
                None
            }
        }
    }

    /// One allow-list constrained classifier call, served from the session
    /// cache when possible. Out-of-list answers and failures yield `None`.
    async fn ask(&self, question: &str, allow: &[String], kind: &str) -> Option<String> {
        let prompt = choice_prompt(question, allow);
        let cached = self.cache.lock().ok().and_then(|mut cache| cache.get(&prompt));

        let answer = match cached {
            Some(answer) => {
                debug!(kind, "classifier cache hit");
                answer
            }
            None => match self.classifier.choose(&prompt, allow).await {
                Ok(answer) => {
                    if let Ok(mut cache) = self.cache.lock() {
                        cache.insert(&prompt, answer.clone());
                    }
                    answer
                }
                Err(err) => {
                    warn!(kind, error = %err, retryable = err.retryable(), "classifier call failed");
                    return None;
                }
            },
        };

        if allow.iter().any(|item| item == &answer) {
            info!(kind, choice = %answer, "classifier accepted");
            Some(answer)
        } else {
            warn!(kind, choice = %answer, "classifier answer rejected");
            None
        }
    }
}

/// Deterministic property name for headers nothing else could resolve:
/// punctuation dropped, whitespace runs joined with `_`, lower-cased.
pub fn synthesize_property(raw: &str) -> String {
    let kept: String = raw
        .chars()
        .filter(|value| value.is_alphanumeric() || *value == '_' || value.is_whitespace())
        .collect();
    let name = kept
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase();
    if name.is_empty() {
        "unnamed".to_string()
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::synthesize_property;

    #[test]
    fn synthesized_names_are_snake_case() {
        assert_eq!(synthesize_property("Max. Allowable  Pressure (kPa)"), "max_allowable_pressure_kpa");
        assert_eq!(synthesize_property("  NPSH-r "), "npshr");
        assert_eq!(synthesize_property("%%"), "unnamed");
    }
}
