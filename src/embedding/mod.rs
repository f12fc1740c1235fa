//! Embedding batcher.
//!
//! Converts chunk texts into vectors through an external embedding API,
//! splitting input into provider-sized batches with retry on rate limits.
//! When no provider is configured every text is routed to the deterministic
//! placeholder generator, so the pipeline keeps functioning offline.

mod http;
mod placeholder;

pub use http::HttpEmbeddingClient;
pub(crate) use http::classify_status;
pub use placeholder::placeholder_embedding;

use crate::config::EmbeddingConfig;
use crate::error::{EmbeddingError, ProviderError};
use crate::types::{CodeChunk, EmbeddingMode};
use async_trait::async_trait;
use std::sync::Arc;

pub struct EmbeddingUsage {
    pub total_tokens: u64,
}

/// One embedding with its original request index. Providers are not
/// guaranteed to preserve request order.
pub struct EmbeddingData {
    pub index: usize,
    pub embedding: Vec<f32>,
}

pub struct EmbeddingResponse {
    pub data: Vec<EmbeddingData>,
    pub usage: EmbeddingUsage,
}

/// External embedding provider contract
#[async_trait]
pub trait EmbeddingApi: Send + Sync {
    async fn embed(
        &self,
        texts: &[String],
        model: &str,
        dimensions: usize,
    ) -> Result<EmbeddingResponse, ProviderError>;
}

pub struct EmbeddingBatcher {
    api: Option<Arc<dyn EmbeddingApi>>,
    config: EmbeddingConfig,
}

impl EmbeddingBatcher {
    pub fn new(api: Option<Arc<dyn EmbeddingApi>>, config: EmbeddingConfig) -> Self {
        if api.is_none() {
            tracing::warn!("no embedding provider configured, using placeholder embeddings");
        }
        Self { api, config }
    }

    /// Build a batcher from configuration alone: an HTTP client when an API
    /// key is present, placeholder mode otherwise.
    pub fn from_config(config: EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let api: Option<Arc<dyn EmbeddingApi>> = match &config.api_key {
            Some(key) => Some(Arc::new(HttpEmbeddingClient::new(&config, key.clone())?)),
            None => None,
        };
        Ok(Self::new(api, config))
    }

    /// Placeholder-only batcher, used for offline operation and tests
    pub fn offline(config: EmbeddingConfig) -> Self {
        Self { api: None, config }
    }

    pub fn mode(&self) -> EmbeddingMode {
        if self.api.is_some() {
            EmbeddingMode::Real
        } else {
            EmbeddingMode::Placeholder
        }
    }

    pub fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    /// Embed a list of texts, one vector per input in input order.
    ///
    /// Real mode fails atomically: a batch that exhausts its retry budget
    /// propagates the error rather than returning partial results, so the
    /// vector store never sees a half-embedded run.
    pub async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let dims = self.config.dimensions;
        let Some(api) = &self.api else {
            return Ok(texts
                .iter()
                .map(|t| placeholder_embedding(t, dims))
                .collect());
        };

        let backoff = self.config.backoff();
        let mut out = Vec::with_capacity(texts.len());

        for (batch_index, batch) in texts.chunks(self.config.max_batch).enumerate() {
            if batch_index > 0 {
                tokio::time::sleep(self.config.batch_delay()).await;
            }

            let api = api.clone();
            let model = self.config.model.clone();
            let batch_owned: Vec<String> = batch.to_vec();
            let response = backoff
                .run(ProviderError::is_transient, move |_attempt| {
                    let api = api.clone();
                    let model = model.clone();
                    let texts = batch_owned.clone();
                    async move { api.embed(&texts, &model, dims).await }
                })
                .await?;

            if response.data.len() != batch.len() {
                return Err(EmbeddingError::CountMismatch {
                    requested: batch.len(),
                    received: response.data.len(),
                });
            }

            // Restore request order before concatenating
            let mut data = response.data;
            data.sort_by_key(|d| d.index);

            for item in data {
                if item.embedding.len() != dims {
                    return Err(EmbeddingError::DimensionMismatch {
                        expected: dims,
                        actual: item.embedding.len(),
                    });
                }
                out.push(item.embedding);
            }

            tracing::debug!(
                batch = batch_index,
                size = batch.len(),
                tokens = response.usage.total_tokens,
                "embedded batch"
            );
        }

        Ok(out)
    }

    /// Single-text convenience wrapper
    pub async fn embed_text(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let input = [text.to_string()];
        let mut vectors = self.embed_texts(&input).await?;
        vectors.pop().ok_or(EmbeddingError::CountMismatch {
            requested: 1,
            received: 0,
        })
    }

    /// Embed chunks using their metadata-enriched embedding text
    pub async fn embed_chunks(&self, chunks: &[CodeChunk]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let texts: Vec<String> = chunks.iter().map(|c| c.embedding_text()).collect();
        self.embed_texts(&texts).await
    }
}
