use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::core::errors::{AppError, AppResult};
use crate::providers::ContextProvider;

const MAX_SNIPPETS: usize = 3;

/// Short background text from the DuckDuckGo instant-answer API.
#[derive(Debug, Clone)]
pub struct WebContext {
    http: reqwest::Client,
    endpoint: String,
}

impl WebContext {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::Network(err.to_string()))?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl ContextProvider for WebContext {
    async fn context_for(&self, query: &str) -> AppResult<String> {
        let response = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    AppError::ProviderTimeout
                } else {
                    AppError::Network(err.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(AppError::ProviderInvalidResponse(format!(
                "context lookup returned status {}",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| AppError::ProviderInvalidResponse(err.to_string()))?;
        let text = collect_snippets(&body, MAX_SNIPPETS);
        if text.is_empty() {
            return Err(AppError::NotFound(format!("no context for '{query}'")));
        }
        Ok(text)
    }
}

/// Joins the abstract and the first related-topic texts of an instant answer.
pub fn collect_snippets(body: &Value, max: usize) -> String {
    let mut snippets: Vec<&str> = vec![];
    if let Some(text) = body.get("AbstractText").and_then(Value::as_str) {
        if !text.trim().is_empty() {
            snippets.push(text.trim());
        }
    }

    let mut stack: Vec<&Value> = body
        .get("RelatedTopics")
        .and_then(Value::as_array)
        .map(|items| items.iter().rev().collect())
        .unwrap_or_default();
    while let Some(topic) = stack.pop() {
        if snippets.len() >= max {
            break;
        }
        if let Some(text) = topic.get("Text").and_then(Value::as_str) {
            if !text.trim().is_empty() {
                snippets.push(text.trim());
            }
        }
        if let Some(children) = topic.get("Topics").and_then(Value::as_array) {
            stack.extend(children.iter().rev());
        }
    }

    snippets.truncate(max);
    snippets.join(" ")
}
