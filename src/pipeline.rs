//! Pipeline orchestration.
//!
//! Wires the extractor, embedding batcher, generator, and vector store into
//! the three job flows: full repository analysis, incremental analysis of
//! changed files, and documentation generation. Implements [`JobHandler`] so
//! a [`QueueWorker`](crate::queue::QueueWorker) can drive it directly.

use crate::chunker::ChunkExtractor;
use crate::config::Config;
use crate::embedding::EmbeddingBatcher;
use crate::error::DocgenError;
use crate::generator::{DocGenerator, DocumentationSet};
use crate::progress::ProgressObserver;
use crate::queue::{Job, JobHandler, JobKind, JobPayload};
use crate::source::FileSource;
use crate::types::{CodeChunk, DocType, EmbeddingMode, GenerationResult};
use crate::vector_store::{VectorRecord, VectorStore};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Outcome of one analysis run
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub repository_id: String,
    pub files_scanned: usize,
    /// Files skipped for unsupported language, parse failure, or read error
    pub files_skipped: usize,
    pub chunks_extracted: usize,
    pub vectors_stored: usize,
    pub embedding_mode: EmbeddingMode,
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

/// Outcome of one documentation-generation run
#[derive(Debug, Clone, Serialize)]
pub struct DocumentationReport {
    pub repository_id: String,
    pub requested: Vec<DocType>,
    pub generated: usize,
    pub failed: usize,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub results: Vec<GenerationResult>,
    pub duration_ms: u64,
}

pub struct DocPipeline {
    extractor: ChunkExtractor,
    embedder: EmbeddingBatcher,
    generator: DocGenerator,
    store: Arc<dyn VectorStore>,
    source: Arc<dyn FileSource>,
    config: Config,
}

impl DocPipeline {
    pub fn new(
        config: Config,
        embedder: EmbeddingBatcher,
        generator: DocGenerator,
        store: Arc<dyn VectorStore>,
        source: Arc<dyn FileSource>,
    ) -> Self {
        Self {
            extractor: ChunkExtractor::with_config(config.chunking.clone()),
            embedder,
            generator,
            store,
            source,
            config,
        }
    }

    /// Extract chunks from the given files, skipping unreadable ones.
    /// Returns the chunks plus per-file skip and error accounting.
    async fn extract(
        &self,
        files: &[String],
        progress: Option<(&dyn ProgressObserver, usize)>,
    ) -> (Vec<CodeChunk>, usize, Vec<String>) {
        let mut chunks = Vec::new();
        let mut skipped = 0;
        let mut errors = Vec::new();

        for (index, path) in files.iter().enumerate() {
            match self.source.read_file(path).await {
                Ok(content) => {
                    let extracted = self.extractor.extract_file(&content, path);
                    if extracted.is_empty() {
                        skipped += 1;
                    }
                    chunks.extend(extracted);
                }
                Err(err) => {
                    skipped += 1;
                    errors.push(format!("{}: {:#}", path, err));
                }
            }
            if let Some((observer, total)) = progress {
                observer.on_progress(index + 1, total);
            }
        }

        (chunks, skipped, errors)
    }

    /// Analyze a repository or a changed-file subset: extract chunks, embed
    /// them, and upsert the vectors keyed by repository, path, and line.
    pub async fn analyze(
        &self,
        payload: &JobPayload,
        changed_only: bool,
        progress: &dyn ProgressObserver,
    ) -> Result<AnalysisReport> {
        let started = Instant::now();

        let files = if changed_only && !payload.changed_files.is_empty() {
            payload.changed_files.clone()
        } else {
            self.source.list_files().await.context("listing files")?
        };

        tracing::info!(
            repository = %payload.full_name,
            files = files.len(),
            changed_only,
            "analysis started"
        );

        // Two trailing progress steps cover embedding and storage
        let total_steps = files.len() + 2;
        let (chunks, files_skipped, mut errors) =
            self.extract(&files, Some((progress, total_steps))).await;

        // Wrapped so the worker can tell transient provider failures, which
        // warrant a retry, from permanent ones
        let vectors = self
            .embedder
            .embed_chunks(&chunks)
            .await
            .map_err(DocgenError::Embedding)
            .context("embedding chunks")?;
        progress.on_progress(files.len() + 1, total_steps);

        let mode = self.embedder.mode();
        let records: Vec<VectorRecord> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| {
                VectorRecord::for_chunk(
                    &payload.repository_id,
                    chunk,
                    vector,
                    mode,
                    self.config.vector_store.snippet_chars,
                )
            })
            .collect();

        let mut stored = 0;
        for batch in records.chunks(self.config.vector_store.upsert_batch) {
            match self.store.upsert(batch.to_vec()).await {
                Ok(()) => stored += batch.len(),
                Err(err) => errors.push(format!("upsert failed: {}", err)),
            }
        }
        progress.on_progress(total_steps, total_steps);

        let report = AnalysisReport {
            repository_id: payload.repository_id.clone(),
            files_scanned: files.len(),
            files_skipped,
            chunks_extracted: chunks.len(),
            vectors_stored: stored,
            embedding_mode: mode,
            errors,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        tracing::info!(
            repository = %payload.full_name,
            chunks = report.chunks_extracted,
            vectors = report.vectors_stored,
            skipped = report.files_skipped,
            "analysis finished"
        );
        Ok(report)
    }

    /// Generate the requested documentation set over the repository's chunks
    pub async fn generate_docs(
        &self,
        payload: &JobPayload,
        progress: &dyn ProgressObserver,
    ) -> Result<DocumentationReport> {
        let started = Instant::now();

        let files = self.source.list_files().await.context("listing files")?;
        let (chunks, _, _) = self.extract(&files, None).await;

        let requested = if payload.doc_types.is_empty() {
            vec![
                DocType::Readme,
                DocType::Architecture,
                DocType::Module,
                DocType::Function,
                DocType::Class,
            ]
        } else {
            payload.doc_types.clone()
        };

        tracing::info!(
            repository = %payload.full_name,
            chunks = chunks.len(),
            ?requested,
            "documentation generation started"
        );

        let set: DocumentationSet = self
            .generator
            .generate_all(&payload.full_name, &chunks, &requested, progress)
            .await;

        let report = DocumentationReport {
            repository_id: payload.repository_id.clone(),
            requested,
            generated: set.succeeded,
            failed: set.failed,
            input_tokens: set.input_tokens,
            output_tokens: set.output_tokens,
            results: set.results,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        tracing::info!(
            repository = %payload.full_name,
            generated = report.generated,
            failed = report.failed,
            "documentation generation finished"
        );
        Ok(report)
    }
}

#[async_trait]
impl JobHandler for DocPipeline {
    async fn handle(
        &self,
        job: &Job,
        progress: &dyn ProgressObserver,
    ) -> Result<serde_json::Value> {
        let value = match job.kind {
            JobKind::AnalyzeRepository => {
                serde_json::to_value(self.analyze(&job.payload, false, progress).await?)?
            }
            JobKind::AnalyzeChangedFiles => {
                serde_json::to_value(self.analyze(&job.payload, true, progress).await?)?
            }
            JobKind::GenerateDocumentation => {
                serde_json::to_value(self.generate_docs(&job.payload, progress).await?)?
            }
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NullProgress;
    use crate::source::InMemoryFileSource;
    use crate::vector_store::InMemoryVectorStore;

    const UTILS_JS: &str = "function add(a, b) {\n  const sum = a + b;\n  return sum;\n}\n\nfunction sub(a, b) {\n  const diff = a - b;\n  return diff;\n}\n";

    fn offline_pipeline(source: InMemoryFileSource, dimensions: usize) -> (DocPipeline, Arc<InMemoryVectorStore>) {
        let mut config = Config::default();
        config.embedding.dimensions = dimensions;
        let store = Arc::new(InMemoryVectorStore::new(dimensions));
        let pipeline = DocPipeline::new(
            config.clone(),
            EmbeddingBatcher::offline(config.embedding.clone()),
            DocGenerator::new(None, config.generation.clone()),
            store.clone(),
            Arc::new(source),
        );
        (pipeline, store)
    }

    fn payload() -> JobPayload {
        JobPayload {
            repository_id: "repo-1".to_string(),
            full_name: "acme/app".to_string(),
            ..JobPayload::default()
        }
    }

    #[tokio::test]
    async fn test_analyze_stores_placeholder_vectors() {
        let source = InMemoryFileSource::new().with_file("utils.js", UTILS_JS);
        let (pipeline, store) = offline_pipeline(source, 16);

        let report = pipeline
            .analyze(&payload(), false, &NullProgress)
            .await
            .unwrap();

        assert_eq!(report.files_scanned, 1);
        assert_eq!(report.chunks_extracted, 2);
        assert_eq!(report.vectors_stored, 2);
        assert_eq!(report.embedding_mode, EmbeddingMode::Placeholder);
        assert!(report.errors.is_empty());
        assert_eq!(store.count("repo-1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_analyze_skips_unreadable_and_unsupported_files() {
        let source = InMemoryFileSource::new()
            .with_file("utils.js", UTILS_JS)
            .with_file("image.png", "\u{0}\u{1}\u{2}");
        let (pipeline, _) = offline_pipeline(source, 16);

        let mut p = payload();
        p.changed_files = vec![
            "utils.js".to_string(),
            "image.png".to_string(),
            "missing.js".to_string(),
        ];
        let report = pipeline.analyze(&p, true, &NullProgress).await.unwrap();

        assert_eq!(report.files_scanned, 3);
        assert_eq!(report.files_skipped, 2);
        assert_eq!(report.chunks_extracted, 2);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("missing.js"));
    }

    #[tokio::test]
    async fn test_reanalysis_overwrites_instead_of_duplicating() {
        let source = InMemoryFileSource::new().with_file("utils.js", UTILS_JS);
        let (pipeline, store) = offline_pipeline(source, 16);

        pipeline.analyze(&payload(), false, &NullProgress).await.unwrap();
        pipeline.analyze(&payload(), false, &NullProgress).await.unwrap();
        assert_eq!(store.count("repo-1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_generate_docs_without_provider_records_errors() {
        let source = InMemoryFileSource::new().with_file("utils.js", UTILS_JS);
        let (pipeline, _) = offline_pipeline(source, 16);

        let report = pipeline
            .generate_docs(&payload(), &NullProgress)
            .await
            .unwrap();

        // readme + architecture + 1 module + 2 function docs, all failing
        assert_eq!(report.results.len(), 5);
        assert_eq!(report.generated, 0);
        assert_eq!(report.failed, 5);
        assert!(report.results.iter().all(|r| r.error.is_some()));
    }

    #[tokio::test]
    async fn test_handle_dispatches_by_kind() {
        let source = InMemoryFileSource::new().with_file("utils.js", UTILS_JS);
        let (pipeline, _) = offline_pipeline(source, 16);

        let job = Job {
            id: "repo-1-1".to_string(),
            kind: JobKind::AnalyzeRepository,
            payload: payload(),
            priority: 10,
            state: crate::queue::JobState::Active,
            attempts_made: 1,
            progress: Default::default(),
            enqueued_at: chrono::Utc::now(),
            started_at: None,
            finished_at: None,
            not_before: None,
            lease_expires_at: None,
            result: None,
            error: None,
        };

        let value = pipeline.handle(&job, &NullProgress).await.unwrap();
        assert_eq!(value["chunks_extracted"], 2);
        assert_eq!(value["embedding_mode"], "placeholder");
    }
}
