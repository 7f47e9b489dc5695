use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::EmbeddingConfig;
use crate::provider::EmbeddingProvider;
use crate::retry::RetryPolicy;
use crate::{AiError, Result};

/// Client for an endpoint that accepts `{ "text": ... }` and answers
/// `{ "embedding": [...] }`.
#[derive(Debug, Clone)]
pub struct HttpEmbeddingProvider {
    client: Client,
    endpoint: String,
    model: Option<String>,
    timeout: Duration,
    retry: RetryPolicy,
}

impl HttpEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(api_key) = config.api_key.as_deref().map(str::trim) {
            if !api_key.is_empty() {
                let auth = HeaderValue::from_str(&format!("Bearer {}", api_key))
                    .map_err(|_| AiError::Config("invalid embedding API key".to_string()))?;
                headers.insert(AUTHORIZATION, auth);
            }
        }

        let client = Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .build()
            .map_err(|e| AiError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim().to_string(),
            model: config.model.clone(),
            timeout: config.timeout(),
            retry: RetryPolicy::from(config),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// One request, bounded by the configured timeout.
    async fn attempt(&self, text: &str) -> Result<Vec<f32>> {
        tokio::time::timeout(self.timeout, self.embed_once(text))
            .await
            .map_err(|_| AiError::Timeout {
                after_ms: self.timeout.as_millis() as u64,
            })?
    }

    async fn embed_once(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            text,
            model: self.model.as_deref(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = extract_error_message(&body).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
            return Err(AiError::provider(Some(status.as_u16()), message));
        }

        let parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            AiError::provider(
                Some(status.as_u16()),
                format!("invalid embedding response: {}", e),
            )
        })?;

        if parsed.embedding.is_empty() {
            return Err(AiError::provider(
                Some(status.as_u16()),
                "provider returned an empty embedding",
            ));
        }

        debug!(
            "Embedded {} chars into {} dims",
            text.chars().count(),
            parsed.embedding.len()
        );
        Ok(parsed.embedding)
    }

    fn transport_error(&self, err: reqwest::Error) -> AiError {
        if err.is_timeout() {
            AiError::Timeout {
                after_ms: self.timeout.as_millis() as u64,
            }
        } else {
            AiError::from(err)
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.retry
            .run("embedding request", move || self.attempt(text))
            .await
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Pull a human message out of a JSON error body, falling back to the raw body.
fn extract_error_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        let candidate = value
            .get("error")
            .and_then(|e| e.as_str().or_else(|| e.get("message").and_then(|m| m.as_str())))
            .or_else(|| value.get("message").and_then(|m| m.as_str()));
        if let Some(message) = candidate {
            return Some(message.to_string());
        }
    }

    Some(body.to_string())
}
