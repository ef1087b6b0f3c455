pub mod gemini;
pub mod web_context;

use async_trait::async_trait;

use crate::core::errors::{AppError, AppResult};

/// Picks one answer from an explicit allow-list.
///
/// Implementations return the raw `choice` string, `"NONE"` included; the
/// caller treats anything outside `allow` as no answer.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn choose(&self, question: &str, allow: &[String]) -> AppResult<String>;
}

/// Supplies free text used to enrich a second classifier attempt.
#[async_trait]
pub trait ContextProvider: Send + Sync {
    async fn context_for(&self, query: &str) -> AppResult<String>;
}

/// Context provider that never has anything to add.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoContext;

#[async_trait]
impl ContextProvider for NoContext {
    async fn context_for(&self, query: &str) -> AppResult<String> {
        Err(AppError::NotFound(format!("no context provider for '{query}'")))
    }
}
