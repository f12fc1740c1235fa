//! In-memory vector store backend with cosine similarity search.

use super::{VectorMatch, VectorRecord, VectorStore};
use crate::error::VectorStoreError;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

pub struct InMemoryVectorStore {
    dimensions: usize,
    records: RwLock<HashMap<String, VectorRecord>>,
}

impl InMemoryVectorStore {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            records: RwLock::new(HashMap::new()),
        }
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    dot / (mag_a * mag_b)
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<(), VectorStoreError> {
        for record in &records {
            if record.vector.len() != self.dimensions {
                return Err(VectorStoreError::DimensionMismatch {
                    expected: self.dimensions,
                    actual: record.vector.len(),
                });
            }
        }
        let mut map = self.records.write().await;
        for record in records {
            map.insert(record.key.clone(), record);
        }
        Ok(())
    }

    async fn query(
        &self,
        repository_id: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<VectorMatch>, VectorStoreError> {
        if vector.len() != self.dimensions {
            return Err(VectorStoreError::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }

        let map = self.records.read().await;
        let mut matches: Vec<VectorMatch> = map
            .values()
            .filter(|r| r.metadata.repository_id == repository_id)
            .map(|r| VectorMatch {
                key: r.key.clone(),
                score: cosine_similarity(&r.vector, vector),
                metadata: r.metadata.clone(),
            })
            .collect();
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(limit);
        Ok(matches)
    }

    async fn delete_repository(&self, repository_id: &str) -> Result<usize, VectorStoreError> {
        let mut map = self.records.write().await;
        let before = map.len();
        map.retain(|_, r| r.metadata.repository_id != repository_id);
        Ok(before - map.len())
    }

    async fn count(&self, repository_id: &str) -> Result<usize, VectorStoreError> {
        let map = self.records.read().await;
        Ok(map
            .values()
            .filter(|r| r.metadata.repository_id == repository_id)
            .count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChunkKind, CodeChunk, EmbeddingMode};

    fn chunk(name: &str, path: &str, start_line: usize) -> CodeChunk {
        CodeChunk {
            kind: ChunkKind::Function,
            name: name.to_string(),
            content: format!("function {}() {{}}", name),
            docstring: None,
            language: "javascript".to_string(),
            path: path.to_string(),
            start_line,
            end_line: start_line + 3,
        }
    }

    fn record(repo: &str, name: &str, path: &str, line: usize, vector: Vec<f32>) -> VectorRecord {
        VectorRecord::for_chunk(
            repo,
            &chunk(name, path, line),
            vector,
            EmbeddingMode::Placeholder,
            500,
        )
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent_by_key() {
        let store = InMemoryVectorStore::new(3);
        let first = record("r1", "load", "a.js", 10, vec![1.0, 0.0, 0.0]);
        store.upsert(vec![first]).await.unwrap();

        // same repo, path, and start line overwrites instead of duplicating
        let second = record("r1", "load", "a.js", 10, vec![0.0, 1.0, 0.0]);
        store.upsert(vec![second]).await.unwrap();

        assert_eq!(store.count("r1").await.unwrap(), 1);
        let matches = store.query("r1", &[0.0, 1.0, 0.0], 10).await.unwrap();
        assert!((matches[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejected() {
        let store = InMemoryVectorStore::new(3);
        let bad = record("r1", "load", "a.js", 10, vec![1.0, 0.0]);
        assert!(matches!(
            store.upsert(vec![bad]).await,
            Err(VectorStoreError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[tokio::test]
    async fn test_query_ranks_by_similarity_within_repo() {
        let store = InMemoryVectorStore::new(3);
        store
            .upsert(vec![
                record("r1", "near", "a.js", 1, vec![1.0, 0.1, 0.0]),
                record("r1", "far", "a.js", 10, vec![0.0, 1.0, 0.0]),
                record("r2", "other", "a.js", 1, vec![1.0, 0.0, 0.0]),
            ])
            .await
            .unwrap();

        let matches = store.query("r1", &[1.0, 0.0, 0.0], 10).await.unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].metadata.name, "near");
        assert!(matches[0].score > matches[1].score);
    }

    #[tokio::test]
    async fn test_delete_repository_is_scoped() {
        let store = InMemoryVectorStore::new(3);
        store
            .upsert(vec![
                record("r1", "a", "a.js", 1, vec![1.0, 0.0, 0.0]),
                record("r1", "b", "b.js", 1, vec![0.0, 1.0, 0.0]),
                record("r2", "c", "c.js", 1, vec![0.0, 0.0, 1.0]),
            ])
            .await
            .unwrap();

        assert_eq!(store.delete_repository("r1").await.unwrap(), 2);
        assert_eq!(store.count("r1").await.unwrap(), 0);
        assert_eq!(store.count("r2").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_snippet_truncation() {
        let store = InMemoryVectorStore::new(2);
        let mut c = chunk("big", "a.js", 1);
        c.content = "x".repeat(1000);
        let rec = VectorRecord::for_chunk("r1", &c, vec![1.0, 0.0], EmbeddingMode::Real, 500);
        assert_eq!(rec.metadata.snippet.len(), 500);
        store.upsert(vec![rec]).await.unwrap();
    }
}
