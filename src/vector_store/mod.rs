//! Vector store adapter.
//!
//! The store is addressed by deterministic keys derived from repository,
//! path, and start line, so re-analysis of a file overwrites its previous
//! vectors instead of accumulating duplicates. Backends implement the
//! [`VectorStore`] trait; the in-memory backend serves tests and
//! single-process deployments.

mod memory;

pub use memory::InMemoryVectorStore;

use crate::error::VectorStoreError;
use crate::types::{ChunkKind, CodeChunk, EmbeddingMode};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Metadata stored alongside each vector, enough to render a search result
/// without re-reading the source file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorMetadata {
    pub repository_id: String,
    pub path: String,
    pub name: String,
    pub kind: ChunkKind,
    pub language: String,
    pub start_line: usize,
    pub end_line: usize,
    /// Leading slice of the chunk content
    pub snippet: String,
    /// Whether the vector is a real embedding or a placeholder
    pub embedding_mode: EmbeddingMode,
}

#[derive(Debug, Clone)]
pub struct VectorRecord {
    pub key: String,
    pub vector: Vec<f32>,
    pub metadata: VectorMetadata,
}

impl VectorRecord {
    pub fn for_chunk(
        repository_id: &str,
        chunk: &CodeChunk,
        vector: Vec<f32>,
        mode: EmbeddingMode,
        snippet_chars: usize,
    ) -> Self {
        Self {
            key: chunk.vector_key(repository_id),
            vector,
            metadata: VectorMetadata {
                repository_id: repository_id.to_string(),
                path: chunk.path.clone(),
                name: chunk.name.clone(),
                kind: chunk.kind,
                language: chunk.language.clone(),
                start_line: chunk.start_line,
                end_line: chunk.end_line,
                snippet: chunk.content.chars().take(snippet_chars).collect(),
                embedding_mode: mode,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct VectorMatch {
    pub key: String,
    pub score: f32,
    pub metadata: VectorMetadata,
}

/// Storage backend contract for embedding vectors
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or overwrite records by key
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<(), VectorStoreError>;

    /// Nearest-neighbour search within one repository
    async fn query(
        &self,
        repository_id: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<VectorMatch>, VectorStoreError>;

    /// Remove every vector belonging to a repository, returning the count
    async fn delete_repository(&self, repository_id: &str) -> Result<usize, VectorStoreError>;

    /// Number of vectors stored for a repository
    async fn count(&self, repository_id: &str) -> Result<usize, VectorStoreError>;
}
