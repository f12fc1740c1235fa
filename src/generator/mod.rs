//! Documentation batch generator.
//!
//! Drives an external generation API per chunk, per module, and per
//! repository, with bounded concurrency (fixed-size groups), an inter-group
//! delay for steady-state rate limits, and per-chunk failure isolation: one
//! failing chunk never aborts its batch.

mod http;
mod prompts;

pub use http::HttpGenerationClient;
pub use prompts::{ChunkContext, RepositorySummary};

use crate::config::GenerationConfig;
use crate::error::{GenerationError, ProviderError};
use crate::progress::ProgressObserver;
use crate::types::{ChunkRef, CodeChunk, DocType, GenerationResult};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

pub struct GenerationResponse {
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// External generation provider contract
#[async_trait]
pub trait GenerationApi: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        max_output_tokens: u32,
    ) -> Result<GenerationResponse, ProviderError>;
}

/// Everything produced by one `generate_all` run
#[derive(Debug, Clone, Serialize)]
pub struct DocumentationSet {
    pub results: Vec<GenerationResult>,
    pub succeeded: usize,
    pub failed: usize,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl DocumentationSet {
    pub fn from_results(results: Vec<GenerationResult>) -> Self {
        let succeeded = results.iter().filter(|r| r.is_success()).count();
        let failed = results.len() - succeeded;
        let input_tokens = results.iter().map(|r| r.input_tokens).sum();
        let output_tokens = results.iter().map(|r| r.output_tokens).sum();
        Self {
            results,
            succeeded,
            failed,
            input_tokens,
            output_tokens,
        }
    }
}

/// Shifts a stage's progress into a combined multi-stage total
struct OffsetProgress<'a> {
    inner: &'a dyn ProgressObserver,
    offset: usize,
    total: usize,
}

impl ProgressObserver for OffsetProgress<'_> {
    fn on_progress(&self, processed: usize, _total: usize) {
        self.inner.on_progress(self.offset + processed, self.total);
    }
}

pub struct DocGenerator {
    api: Option<Arc<dyn GenerationApi>>,
    config: GenerationConfig,
}

impl DocGenerator {
    pub fn new(api: Option<Arc<dyn GenerationApi>>, config: GenerationConfig) -> Self {
        if api.is_none() {
            tracing::warn!(
                "no generation provider configured, documentation calls will be recorded as errors"
            );
        }
        Self { api, config }
    }

    /// Build a generator from configuration alone: an HTTP client when an
    /// API key is present, an unconfigured generator otherwise.
    pub fn from_config(config: GenerationConfig) -> Result<Self, GenerationError> {
        let api: Option<Arc<dyn GenerationApi>> = match &config.api_key {
            Some(key) => Some(Arc::new(HttpGenerationClient::new(&config, key.clone())?)),
            None => None,
        };
        Ok(Self::new(api, config))
    }

    pub fn is_configured(&self) -> bool {
        self.api.is_some()
    }

    /// Call the provider with retry on transient capacity errors only.
    /// Request-shape and auth errors propagate immediately.
    async fn call(&self, prompt: String, max_tokens: u32) -> Result<GenerationResponse, GenerationError> {
        let api = self.api.clone().ok_or(GenerationError::Unconfigured)?;
        let response = self
            .config
            .backoff()
            .run(ProviderError::is_transient, move |_attempt| {
                let api = api.clone();
                let prompt = prompt.clone();
                async move { api.generate(&prompt, max_tokens).await }
            })
            .await?;

        if response.text.trim().is_empty() {
            return Err(GenerationError::EmptyCompletion);
        }
        Ok(response)
    }

    /// Generate documentation for one chunk, with context assembled from its
    /// sibling chunks (same file) in `siblings`.
    pub async fn generate_for_chunk(
        &self,
        chunk: &CodeChunk,
        siblings: &[CodeChunk],
    ) -> Result<GenerationResult, GenerationError> {
        let context = ChunkContext::for_chunk(chunk, siblings);
        let prompt = prompts::chunk_prompt(chunk, &context);
        let response = self.call(prompt, self.config.max_output_tokens).await?;

        Ok(GenerationResult {
            documentation: Some(response.text),
            doc_type: DocType::for_chunk(chunk.kind).unwrap_or(DocType::Function),
            chunk: Some(ChunkRef::of(chunk)),
            file: None,
            input_tokens: response.input_tokens,
            output_tokens: response.output_tokens,
            error: None,
        })
    }

    /// Generate documentation for a batch of chunks.
    ///
    /// Chunks are processed in fixed-size groups executed concurrently, with
    /// a delay between groups. Returns exactly one result per input chunk;
    /// failures become error records instead of aborting the batch. The
    /// observer is notified `(processed, total)` after each group.
    pub async fn generate_batch(
        &self,
        chunks: &[CodeChunk],
        progress: &dyn ProgressObserver,
    ) -> Vec<GenerationResult> {
        self.generate_batch_with_context(chunks, chunks, progress)
            .await
    }

    /// Like [`generate_batch`](Self::generate_batch), with file-level context
    /// drawn from `siblings`, which may be a superset of `chunks` (imports
    /// and method counts come from chunks that are not documented
    /// themselves).
    pub async fn generate_batch_with_context(
        &self,
        chunks: &[CodeChunk],
        siblings: &[CodeChunk],
        progress: &dyn ProgressObserver,
    ) -> Vec<GenerationResult> {
        let total = chunks.len();
        let mut results = Vec::with_capacity(total);
        let mut processed = 0;

        for (group_index, group) in chunks.chunks(self.config.group_size.max(1)).enumerate() {
            if group_index > 0 {
                tokio::time::sleep(self.config.group_delay()).await;
            }

            let outcomes = futures::future::join_all(
                group.iter().map(|c| self.generate_for_chunk(c, siblings)),
            )
            .await;

            for (chunk, outcome) in group.iter().zip(outcomes) {
                results.push(match outcome {
                    Ok(result) => result,
                    Err(err) => {
                        tracing::warn!(
                            path = %chunk.path,
                            name = %chunk.name,
                            "chunk documentation failed: {}",
                            err
                        );
                        GenerationResult {
                            documentation: None,
                            doc_type: DocType::for_chunk(chunk.kind).unwrap_or(DocType::Function),
                            chunk: Some(ChunkRef::of(chunk)),
                            file: None,
                            input_tokens: 0,
                            output_tokens: 0,
                            error: Some(err.to_string()),
                        }
                    }
                });
            }

            processed += group.len();
            progress.on_progress(processed, total);
        }

        results
    }

    /// Generate module-level documentation for one file
    pub async fn generate_module(
        &self,
        path: &str,
        chunks: &[CodeChunk],
    ) -> Result<GenerationResult, GenerationError> {
        let file_chunks: Vec<CodeChunk> =
            chunks.iter().filter(|c| c.path == path).cloned().collect();
        let prompt = prompts::module_prompt(path, &file_chunks);
        let response = self.call(prompt, self.config.max_output_tokens).await?;

        Ok(GenerationResult {
            documentation: Some(response.text),
            doc_type: DocType::Module,
            chunk: None,
            file: Some(path.to_string()),
            input_tokens: response.input_tokens,
            output_tokens: response.output_tokens,
            error: None,
        })
    }

    /// Generate a README from a repository summary (bounded prompt size)
    pub async fn generate_readme(
        &self,
        summary: &RepositorySummary,
    ) -> Result<GenerationResult, GenerationError> {
        let prompt = prompts::readme_prompt(summary);
        let response = self.call(prompt, self.config.repo_max_output_tokens).await?;
        Ok(repo_result(DocType::Readme, response))
    }

    /// Generate an architecture overview from a repository summary
    pub async fn generate_architecture(
        &self,
        summary: &RepositorySummary,
    ) -> Result<GenerationResult, GenerationError> {
        let prompt = prompts::architecture_prompt(summary);
        let response = self.call(prompt, self.config.repo_max_output_tokens).await?;
        Ok(repo_result(DocType::Architecture, response))
    }

    /// Generate every requested documentation type for a repository.
    ///
    /// Sequences README, architecture, per-file module docs, and per-chunk
    /// docs, with a combined progress total computed up front. Every stage's
    /// failure is recorded per item; the orchestrator always completes.
    pub async fn generate_all(
        &self,
        full_name: &str,
        chunks: &[CodeChunk],
        requested: &[DocType],
        progress: &dyn ProgressObserver,
    ) -> DocumentationSet {
        let want = |t: DocType| requested.contains(&t);

        let doc_chunks: Vec<&CodeChunk> = chunks
            .iter()
            .filter(|c| DocType::for_chunk(c.kind).is_some_and(|t| want(t)))
            .collect();

        let mut files: Vec<&str> = Vec::new();
        if want(DocType::Module) {
            for chunk in chunks {
                if !files.contains(&chunk.path.as_str()) {
                    files.push(chunk.path.as_str());
                }
            }
        }

        let total = usize::from(want(DocType::Readme))
            + usize::from(want(DocType::Architecture))
            + files.len()
            + doc_chunks.len();
        let mut processed = 0;
        let mut results = Vec::with_capacity(total);

        let summary = RepositorySummary::from_chunks(full_name, chunks);

        if want(DocType::Readme) {
            results.push(
                self.generate_readme(&summary)
                    .await
                    .unwrap_or_else(|e| GenerationResult::failed(DocType::Readme, e.to_string())),
            );
            processed += 1;
            progress.on_progress(processed, total);
        }

        if want(DocType::Architecture) {
            results.push(self.generate_architecture(&summary).await.unwrap_or_else(|e| {
                GenerationResult::failed(DocType::Architecture, e.to_string())
            }));
            processed += 1;
            progress.on_progress(processed, total);
        }

        for path in &files {
            results.push(match self.generate_module(path, chunks).await {
                Ok(result) => result,
                Err(e) => {
                    let mut failed = GenerationResult::failed(DocType::Module, e.to_string());
                    failed.file = Some(path.to_string());
                    failed
                }
            });
            processed += 1;
            progress.on_progress(processed, total);
        }

        if !doc_chunks.is_empty() {
            let owned: Vec<CodeChunk> = doc_chunks.into_iter().cloned().collect();
            let staged = OffsetProgress {
                inner: progress,
                offset: processed,
                total,
            };
            // Sibling context comes from the unfiltered chunk list, so
            // import statements still reach the prompts
            results.extend(
                self.generate_batch_with_context(&owned, chunks, &staged)
                    .await,
            );
        }

        DocumentationSet::from_results(results)
    }
}

fn repo_result(doc_type: DocType, response: GenerationResponse) -> GenerationResult {
    GenerationResult {
        documentation: Some(response.text),
        doc_type,
        chunk: None,
        file: None,
        input_tokens: response.input_tokens,
        output_tokens: response.output_tokens,
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{ChannelProgress, NullProgress};
    use crate::types::ChunkKind;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_config() -> GenerationConfig {
        GenerationConfig {
            group_size: 2,
            group_delay_ms: 0,
            initial_backoff_ms: 1,
            ..GenerationConfig::default()
        }
    }

    fn chunk(kind: ChunkKind, name: &str, path: &str) -> CodeChunk {
        CodeChunk {
            kind,
            name: name.to_string(),
            content: format!("body of {}", name),
            docstring: None,
            language: "javascript".to_string(),
            path: path.to_string(),
            start_line: 1,
            end_line: 5,
        }
    }

    /// Provider that records every prompt, fails for prompts mentioning a
    /// poisoned name, and can rate-limit its first N calls.
    struct MockGenerationApi {
        poisoned: Option<String>,
        rate_limit_first: u32,
        calls: AtomicU32,
        prompts: std::sync::Mutex<Vec<String>>,
    }

    impl MockGenerationApi {
        fn ok() -> Self {
            Self {
                poisoned: None,
                rate_limit_first: 0,
                calls: AtomicU32::new(0),
                prompts: std::sync::Mutex::new(Vec::new()),
            }
        }

        fn poisoning(name: &str) -> Self {
            Self {
                poisoned: Some(name.to_string()),
                ..Self::ok()
            }
        }

        fn rate_limiting(first: u32) -> Self {
            Self {
                rate_limit_first: first,
                ..Self::ok()
            }
        }
    }

    #[async_trait]
    impl GenerationApi for MockGenerationApi {
        async fn generate(
            &self,
            prompt: &str,
            _max_output_tokens: u32,
        ) -> Result<GenerationResponse, ProviderError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.rate_limit_first {
                return Err(ProviderError::RateLimited { retry_after: None });
            }
            self.prompts.lock().unwrap().push(prompt.to_string());
            if let Some(poisoned) = &self.poisoned {
                if prompt.contains(poisoned.as_str()) {
                    return Err(ProviderError::BadRequest("poisoned input".to_string()));
                }
            }
            Ok(GenerationResponse {
                text: format!("## Documentation\n\n{} words", prompt.len()),
                input_tokens: 100,
                output_tokens: 50,
            })
        }
    }

    fn generator(api: MockGenerationApi) -> DocGenerator {
        DocGenerator::new(Some(Arc::new(api)), fast_config())
    }

    #[tokio::test]
    async fn test_generate_for_chunk_success() {
        let g = generator(MockGenerationApi::ok());
        let c = chunk(ChunkKind::Function, "load", "a.js");
        let result = g.generate_for_chunk(&c, &[c.clone()]).await.unwrap();
        assert!(result.is_success());
        assert_eq!(result.doc_type, DocType::Function);
        assert_eq!(result.chunk.as_ref().unwrap().name, "load");
        assert_eq!(result.input_tokens, 100);
    }

    #[tokio::test]
    async fn test_unconfigured_generator_errors() {
        let g = DocGenerator::new(None, fast_config());
        let c = chunk(ChunkKind::Function, "load", "a.js");
        let err = g.generate_for_chunk(&c, &[]).await.unwrap_err();
        assert!(matches!(err, GenerationError::Unconfigured));
    }

    #[tokio::test]
    async fn test_batch_partial_failure_isolation() {
        let g = generator(MockGenerationApi::poisoning("badFn"));
        let chunks = vec![
            chunk(ChunkKind::Function, "goodOne", "a.js"),
            chunk(ChunkKind::Function, "badFn", "a.js"),
            chunk(ChunkKind::Function, "goodTwo", "a.js"),
        ];

        let results = g.generate_batch(&chunks, &NullProgress).await;
        assert_eq!(results.len(), 3);
        assert!(results[0].is_success());
        assert!(!results[1].is_success());
        assert!(results[1].error.is_some());
        assert!(results[1].documentation.is_none());
        assert!(results[2].is_success());
    }

    #[tokio::test]
    async fn test_batch_progress_reported_per_group() {
        let g = generator(MockGenerationApi::ok());
        let chunks: Vec<CodeChunk> = (0..5)
            .map(|i| chunk(ChunkKind::Function, &format!("f{}", i), "a.js"))
            .collect();

        let (observer, mut rx) = ChannelProgress::new();
        let results = g.generate_batch(&chunks, &observer).await;
        assert_eq!(results.len(), 5);

        // group_size 2 over 5 chunks: groups of 2, 2, 1
        assert_eq!(rx.try_recv().unwrap(), (2, 5));
        assert_eq!(rx.try_recv().unwrap(), (4, 5));
        assert_eq!(rx.try_recv().unwrap(), (5, 5));
    }

    #[tokio::test]
    async fn test_rate_limit_retried_then_succeeds() {
        let g = generator(MockGenerationApi::rate_limiting(2));
        let c = chunk(ChunkKind::Class, "Widget", "a.js");
        let result = g.generate_for_chunk(&c, &[c.clone()]).await.unwrap();
        assert!(result.is_success());
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let api = MockGenerationApi::poisoning("load");
        let g = generator(api);
        let c = chunk(ChunkKind::Function, "load", "a.js");
        let err = g.generate_for_chunk(&c, &[c.clone()]).await.unwrap_err();
        assert!(matches!(
            err,
            GenerationError::Provider(ProviderError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_generate_all_combined_progress_and_results() {
        let g = generator(MockGenerationApi::ok());
        let chunks = vec![
            chunk(ChunkKind::Class, "Widget", "widget.js"),
            chunk(ChunkKind::Method, "render", "widget.js"),
            chunk(ChunkKind::Function, "helper", "util.js"),
        ];
        let requested = [
            DocType::Readme,
            DocType::Architecture,
            DocType::Module,
            DocType::Function,
            DocType::Class,
        ];

        let (observer, mut rx) = ChannelProgress::new();
        let set = g
            .generate_all("acme/app", &chunks, &requested, &observer)
            .await;

        // readme + architecture + 2 modules + 3 chunk docs
        assert_eq!(set.results.len(), 7);
        assert_eq!(set.succeeded, 7);
        assert_eq!(set.failed, 0);
        assert_eq!(set.input_tokens, 700);

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        // single combined total across heterogeneous stages
        assert!(events.iter().all(|(_, total)| *total == 7));
        assert_eq!(events.last().copied(), Some((7, 7)));
    }

    #[tokio::test]
    async fn test_generate_all_unconfigured_records_errors() {
        let g = DocGenerator::new(None, fast_config());
        let chunks = vec![chunk(ChunkKind::Function, "solo", "a.js")];
        let set = g
            .generate_all(
                "acme/app",
                &chunks,
                &[DocType::Readme, DocType::Function],
                &NullProgress,
            )
            .await;

        assert_eq!(set.results.len(), 2);
        assert_eq!(set.failed, 2);
        assert!(set.results.iter().all(|r| r.error.is_some()));
    }

    #[tokio::test]
    async fn test_generate_all_skips_unrequested_types() {
        let g = generator(MockGenerationApi::ok());
        let chunks = vec![
            chunk(ChunkKind::Function, "one", "a.js"),
            chunk(ChunkKind::Class, "Two", "a.js"),
        ];
        let set = g
            .generate_all("acme/app", &chunks, &[DocType::Function], &NullProgress)
            .await;

        // only the function chunk is documented
        assert_eq!(set.results.len(), 1);
        assert_eq!(set.results[0].doc_type, DocType::Function);
    }

    #[tokio::test]
    async fn test_generate_all_keeps_import_context_in_chunk_prompts() {
        let api = Arc::new(MockGenerationApi::ok());
        let g = DocGenerator::new(Some(api.clone()), fast_config());

        let mut import = chunk(ChunkKind::Import, "anonymous", "a.js");
        import.content = "import fs from 'fs';".to_string();
        let chunks = vec![import, chunk(ChunkKind::Function, "load", "a.js")];

        let set = g
            .generate_all("acme/app", &chunks, &[DocType::Function], &NullProgress)
            .await;
        assert_eq!(set.results.len(), 1);

        // import chunks are not documented themselves, but they still feed
        // the file-level context of the documented chunks
        let prompts = api.prompts.lock().unwrap();
        assert!(prompts
            .iter()
            .any(|p| p.contains("Imports in this file") && p.contains("import fs from 'fs';")));
    }
}
