//! HTTP embedding provider (OpenAI-compatible `/embeddings` endpoint).

use super::{EmbeddingApi, EmbeddingData, EmbeddingResponse, EmbeddingUsage};
use crate::config::EmbeddingConfig;
use crate::error::ProviderError;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

pub struct HttpEmbeddingClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct WireResponse {
    data: Vec<WireData>,
    #[serde(default)]
    usage: WireUsage,
}

#[derive(Deserialize)]
struct WireData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Deserialize, Default)]
struct WireUsage {
    #[serde(default)]
    total_tokens: u64,
}

impl HttpEmbeddingClient {
    pub fn new(config: &EmbeddingConfig, api_key: String) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl EmbeddingApi for HttpEmbeddingClient {
    async fn embed(
        &self,
        texts: &[String],
        model: &str,
        dimensions: usize,
    ) -> Result<EmbeddingResponse, ProviderError> {
        let body = serde_json::json!({
            "model": model,
            "input": texts,
            "dimensions": dimensions,
        });

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = retry_after_header(&response);
            let text = response.text().await.unwrap_or_default();
            return Err(classify_status(status, retry_after, text));
        }

        let wire: WireResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        Ok(EmbeddingResponse {
            data: wire
                .data
                .into_iter()
                .map(|d| EmbeddingData {
                    index: d.index,
                    embedding: d.embedding,
                })
                .collect(),
            usage: EmbeddingUsage {
                total_tokens: wire.usage.total_tokens,
            },
        })
    }
}

fn retry_after_header(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Map HTTP status codes onto the provider error taxonomy. Rate-limit and
/// overload conditions must stay distinguishable from permanent errors.
pub(crate) fn classify_status(
    status: reqwest::StatusCode,
    retry_after: Option<Duration>,
    body: String,
) -> ProviderError {
    match status.as_u16() {
        429 => ProviderError::RateLimited { retry_after },
        401 | 403 => ProviderError::Auth(body),
        503 | 529 => ProviderError::Overloaded(format!("{}: {}", status, body)),
        s if status.is_server_error() => ProviderError::Overloaded(format!("{}: {}", s, body)),
        _ => ProviderError::BadRequest(format!("{}: {}", status, body)),
    }
}
