use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::errors::{AppError, AppResult};
use crate::providers::Classifier;

const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    model: String,
    endpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeminiChoice {
    #[serde(default)]
    pub choice: Option<String>,
}

impl GeminiClient {
    pub fn new(model: impl Into<String>) -> AppResult<Self> {
        Self::with_timeout(model, Duration::from_secs(60))
    }

    pub fn with_timeout(model: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::Network(err.to_string()))?;
        Ok(Self {
            http,
            model: model.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Asks the model to pick one value of `allow` (or `NONE`) and returns
    /// the raw `choice` string it produced.
    pub async fn generate_choice(
        &self,
        api_key: &str,
        prompt: &str,
        allow: &[String],
    ) -> AppResult<String> {
        let mut options = allow.to_vec();
        options.push("NONE".to_string());
        let payload = serde_json::json!({
            "contents": [
                {
                    "role": "user",
                    "parts": [{"text": prompt}]
                }
            ],
            "generationConfig": {
                "temperature": 0.0,
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "OBJECT",
                    "properties": {
                        "choice": {"type": "STRING", "enum": options}
                    },
                    "required": ["choice"]
                }
            }
        });

        let text = self.generate_text(api_key, &payload).await?;
        parse_choice(&text)
    }

    async fn generate_text(&self, api_key: &str, payload: &Value) -> AppResult<String> {
        let endpoint = format!(
            "{}/{}:generateContent?key={}",
            self.endpoint.trim_end_matches('/'),
            self.model,
            api_key
        );

        let response = self
            .http
            .post(endpoint)
            .json(payload)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    AppError::ProviderTimeout
                } else {
                    AppError::Network(err.to_string())
                }
            })?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return Err(AppError::ProviderAuth),
            StatusCode::TOO_MANY_REQUESTS => return Err(AppError::ProviderRateLimited),
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                return Err(AppError::ProviderInvalidResponse(format!(
                    "status {status} body {body}"
                )));
            }
            _ => {}
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| AppError::ProviderInvalidResponse(err.to_string()))?;
        candidate_text(&body)
    }
}

fn candidate_text(body: &Value) -> AppResult<String> {
    body.get("candidates")
        .and_then(Value::as_array)
        .and_then(|items: &Vec<Value>| items.first())
        .and_then(|item: &Value| item.get("content"))
        .and_then(|content: &Value| content.get("parts"))
        .and_then(Value::as_array)
        .and_then(|parts: &Vec<Value>| parts.first())
        .and_then(|part: &Value| part.get("text"))
        .and_then(Value::as_str)
        .map(ToString::to_string)
        .ok_or_else(|| AppError::ProviderInvalidResponse("missing text candidate".to_string()))
}

fn parse_choice(text: &str) -> AppResult<String> {
    let parsed: GeminiChoice = serde_json::from_str(text.trim())
        .map_err(|err| AppError::ProviderInvalidResponse(format!("choice output not JSON: {err}")))?;
    Ok(parsed
        .choice
        .map(|value| value.trim().to_string())
        .unwrap_or_else(|| "NONE".to_string()))
}

/// [`Classifier`] backed by a Gemini model and one API key.
#[derive(Debug, Clone)]
pub struct GeminiClassifier {
    client: GeminiClient,
    api_key: String,
}

impl GeminiClassifier {
    pub fn new(client: GeminiClient, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl Classifier for GeminiClassifier {
    async fn choose(&self, question: &str, allow: &[String]) -> AppResult<String> {
        self.client
            .generate_choice(&self.api_key, question, allow)
            .await
    }
}
