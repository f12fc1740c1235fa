//! # Docgen Core - Asynchronous Documentation Generation Pipeline
//!
//! An async pipeline that turns source repositories into embeddings and
//! generated documentation. Work arrives as queued jobs, source files are
//! broken into semantic chunks with tree-sitter, chunks are embedded in
//! provider-sized batches, and documentation is generated per chunk, per
//! module, and per repository with bounded concurrency.
//!
//! ## Key Features
//!
//! - **Priority Job Queue**: In-memory queue with lease-based delivery,
//!   retry with exponential backoff, duplicate-job merging, and bounded
//!   retention of finished jobs
//! - **AST-Based Chunking**: Tree-sitter parsing for JavaScript, TypeScript,
//!   Python, Rust, Go, and Java, normalized into a closed chunk vocabulary
//! - **Batched Embeddings**: Provider-sized batches with order restoration
//!   and a deterministic placeholder mode for offline operation
//! - **Batch Generation**: Concurrent generation groups with per-chunk
//!   failure isolation; one failing chunk never aborts its batch
//! - **Keyed Vector Storage**: Deterministic vector keys so re-analysis
//!   overwrites stale vectors instead of duplicating them
//!
//! ## Architecture
//!
//! ```text
//! webhook / API ──► JobQueue ──► QueueWorker ──► DocPipeline
//!                                                   │
//!                       ┌───────────────┬───────────┼──────────────┐
//!                       ▼               ▼           ▼              ▼
//!                 ChunkExtractor  EmbeddingBatcher  DocGenerator  VectorStore
//!                 (tree-sitter)   (HTTP/placeholder) (HTTP)       (in-memory)
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use docgen_core::config::Config;
//! use docgen_core::embedding::EmbeddingBatcher;
//! use docgen_core::generator::DocGenerator;
//! use docgen_core::pipeline::DocPipeline;
//! use docgen_core::queue::{JobKind, JobPayload, JobQueue, QueueWorker};
//! use docgen_core::source::InMemoryFileSource;
//! use docgen_core::vector_store::InMemoryVectorStore;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::new()?;
//! let pipeline = DocPipeline::new(
//!     config.clone(),
//!     EmbeddingBatcher::from_config(config.embedding.clone())?,
//!     DocGenerator::from_config(config.generation.clone())?,
//!     Arc::new(InMemoryVectorStore::new(config.embedding.dimensions)),
//!     Arc::new(InMemoryFileSource::new().with_file("main.js", "function f() {}")),
//! );
//!
//! let queue = Arc::new(JobQueue::new(config.queue.clone()));
//! queue.enqueue(
//!     JobKind::AnalyzeRepository,
//!     JobPayload {
//!         repository_id: "repo-1".to_string(),
//!         full_name: "acme/app".to_string(),
//!         ..JobPayload::default()
//!     },
//! )?;
//!
//! let worker = QueueWorker::new(queue.clone(), Arc::new(pipeline));
//! worker.run(CancellationToken::new()).await;
//! # Ok(())
//! # }
//! ```

pub mod chunker;
pub mod config;
pub mod embedding;
pub mod error;
pub mod generator;
pub mod pipeline;
pub mod progress;
pub mod queue;
pub mod retry;
pub mod source;
pub mod types;
pub mod vector_store;

pub use chunker::ChunkExtractor;
pub use config::Config;
pub use embedding::EmbeddingBatcher;
pub use error::DocgenError;
pub use generator::DocGenerator;
pub use pipeline::DocPipeline;
pub use queue::{JobKind, JobPayload, JobQueue, QueueWorker};
pub use types::{ChunkKind, CodeChunk, DocType, EmbeddingMode};
pub use vector_store::{InMemoryVectorStore, VectorStore};
