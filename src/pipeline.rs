use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{
    align::BoundingBoxAligner,
    core::{
        config::ReconConfig,
        errors::AppResult,
        types::{DocumentInput, DocumentOutput},
    },
    graph::{IdentityLinker, RelationshipGraphBuilder},
    mapper::{CanonicalStore, Resolver, TableIngestor},
    postprocess::{camel_case_keys, coerce_numerics},
    providers::{
        gemini::{GeminiClassifier, GeminiClient},
        web_context::WebContext,
        Classifier, ContextProvider, NoContext,
    },
    schema::SchemaSpec,
};

/// One reconciliation session: a schema, its collaborators and the
/// classifier cache shared by every document it processes.
pub struct DocumentPipeline {
    schema: Arc<SchemaSpec>,
    config: ReconConfig,
    aligner: BoundingBoxAligner,
    ingestor: TableIngestor,
    linker: IdentityLinker,
    graph: RelationshipGraphBuilder,
}

impl DocumentPipeline {
    pub fn new(
        schema: Arc<SchemaSpec>,
        config: ReconConfig,
        classifier: Arc<dyn Classifier>,
        context: Arc<dyn ContextProvider>,
    ) -> Self {
        let resolver = Resolver::new(
            schema.clone(),
            classifier,
            context,
            config.resolver.clone(),
        );
        Self {
            aligner: BoundingBoxAligner::new(config.aligner.clone()),
            ingestor: TableIngestor::new(Arc::new(resolver)),
            linker: IdentityLinker::new(schema.clone(), config.graph.clone()),
            graph: RelationshipGraphBuilder::new(schema.clone(), config.graph.clone()),
            schema,
            config,
        }
    }

    /// Builds the Gemini classifier and the web context provider from config.
    pub fn from_config(schema: Arc<SchemaSpec>, config: ReconConfig) -> AppResult<Self> {
        let timeout = Duration::from_secs(config.provider.timeout_secs.max(1));
        let client = GeminiClient::with_timeout(config.provider.model.clone(), timeout)?;
        let classifier = GeminiClassifier::new(client, config.provider.api_key()?);
        let context: Arc<dyn ContextProvider> = if config.resolver.enrich_with_context {
            Arc::new(WebContext::new(config.provider.context_endpoint.clone(), timeout)?)
        } else {
            Arc::new(NoContext)
        };
        Ok(Self::new(schema, config, Arc::new(classifier), context))
    }

    pub fn schema(&self) -> &SchemaSpec {
        &self.schema
    }

    pub fn config(&self) -> &ReconConfig {
        &self.config
    }

    pub fn resolver(&self) -> &Arc<Resolver> {
        self.ingestor.resolver()
    }

    /// Processes one document end to end. The first unrecoverable error
    /// aborts the document; no partial tree is returned.
    pub async fn run(&self, input: DocumentInput) -> AppResult<DocumentOutput> {
        let started = Instant::now();
        let DocumentInput {
            document_id,
            ocr_tokens,
            properties,
            tables,
        } = input;

        let properties = self.aligner.align(&ocr_tokens, properties)?;

        let store = Mutex::new(CanonicalStore::new(self.schema.clone()));
        let reports = self.ingestor.ingest_all(&tables, &store).await;
        let mut tree = store.into_inner().into_tree();
        debug!(tables = reports.len(), entities = tree.len(), "ingestion complete");

        if self.config.pipeline.coerce_numbers {
            let changed: usize = tree.values_mut().map(coerce_numerics).sum();
            debug!(changed, "numeric strings coerced");
        }

        let mut document_id = document_id;
        if self.config.pipeline.link_identities {
            if let Some(root) = self.linker.link_all(&mut tree, document_id.as_deref()) {
                document_id = Some(root);
            }
        }

        if self.config.pipeline.camel_case_keys {
            camel_case_keys(&mut tree);
        }

        self.graph.ensure_all_entities_present(&mut tree);
        let relationships = self.graph.generate_relationships(&tree)?;
        self.graph.clean_uuid(&mut tree);

        let (cache_hits, cache_misses) = self.resolver().cache_stats();
        info!(
            document_id = document_id.as_deref().unwrap_or("-"),
            properties = properties.len(),
            tables = reports.len(),
            relationships = relationships.len(),
            cache_hits,
            cache_misses,
            latency_ms = started.elapsed().as_millis() as u64,
            "document reconciled"
        );

        Ok(DocumentOutput {
            document_id,
            properties,
            canonical: tree,
            relationships,
            tables: reports,
            processed_at: Utc::now(),
        })
    }
}
