/// Centralized error types for the documentation pipeline using thiserror
///
/// Provides domain-specific error types so callers can distinguish transient
/// provider failures (retryable) from permanent request errors.
use std::time::Duration;
use thiserror::Error;

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum DocgenError {
    #[error("Chunking error: {0}")]
    Chunking(#[from] ChunkingError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Vector store error: {0}")]
    VectorStore(#[from] VectorStoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Errors returned by external embedding/generation providers.
///
/// The variants matter more than the messages: `RateLimited` and `Overloaded`
/// drive the retry path, everything else propagates immediately.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("rate limited by provider")]
    RateLimited { retry_after: Option<Duration> },

    #[error("provider overloaded: {0}")]
    Overloaded(String),

    #[error("authentication rejected: {0}")]
    Auth(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed provider response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Transient capacity errors are the only retryable class; request-shape
    /// and auth errors cannot succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimited { .. } | ProviderError::Overloaded(_)
        )
    }
}

/// Errors related to chunk extraction
#[derive(Error, Debug)]
pub enum ChunkingError {
    #[error("Unsupported language for extension: {0}")]
    UnsupportedLanguage(String),

    #[error("Failed to load grammar for {language}: {reason}")]
    GrammarLoadFailed { language: String, reason: String },

    #[error("Failed to parse {0}")]
    ParseFailed(String),
}

/// Errors related to embedding generation
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Embedding count mismatch: requested {requested}, received {received}")]
    CountMismatch { requested: usize, received: usize },

    #[error("Invalid embedding dimension: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Errors related to documentation generation
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Generation provider is not configured")]
    Unconfigured,

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Provider returned an empty completion")]
    EmptyCompletion,
}

/// Errors related to the job queue
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Job '{0}' is not active")]
    NotActive(String),

    #[error("Invalid payload for job '{id}': {reason}")]
    InvalidPayload { id: String, reason: String },
}

/// Errors related to vector storage. Backends with richer failure modes
/// extend this as they are added; the in-memory backend can only reject
/// mismatched dimensions.
#[derive(Error, Debug)]
pub enum VectorStoreError {
    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {0}")]
    LoadFailed(String),

    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
}

impl From<anyhow::Error> for DocgenError {
    fn from(err: anyhow::Error) -> Self {
        DocgenError::Other(format!("{:#}", err))
    }
}

impl DocgenError {
    /// Create a new error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        DocgenError::Other(msg.into())
    }

    /// Check whether the underlying failure is a transient provider condition
    pub fn is_retryable(&self) -> bool {
        match self {
            DocgenError::Provider(p) => p.is_transient(),
            DocgenError::Embedding(EmbeddingError::Provider(p)) => p.is_transient(),
            DocgenError::Generation(GenerationError::Provider(p)) => p.is_transient(),
            DocgenError::Io(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_transient() {
        assert!(ProviderError::RateLimited { retry_after: None }.is_transient());
        assert!(ProviderError::Overloaded("529".to_string()).is_transient());
        assert!(!ProviderError::Auth("bad key".to_string()).is_transient());
        assert!(!ProviderError::BadRequest("missing model".to_string()).is_transient());
    }

    #[test]
    fn test_error_display() {
        let err = DocgenError::Chunking(ChunkingError::UnsupportedLanguage("xyz".to_string()));
        assert_eq!(
            err.to_string(),
            "Chunking error: Unsupported language for extension: xyz"
        );
    }

    #[test]
    fn test_is_retryable_through_wrappers() {
        let rate_limited: DocgenError =
            EmbeddingError::Provider(ProviderError::RateLimited { retry_after: None }).into();
        assert!(rate_limited.is_retryable());

        let bad_request: DocgenError =
            GenerationError::Provider(ProviderError::BadRequest("nope".to_string())).into();
        assert!(!bad_request.is_retryable());

        let not_found: DocgenError = QueueError::JobNotFound("abc".to_string()).into();
        assert!(!not_found.is_retryable());
    }

    #[test]
    fn test_error_from_anyhow() {
        let err: DocgenError = anyhow::anyhow!("boom").into();
        assert!(matches!(err, DocgenError::Other(_)));
    }

    #[test]
    fn test_embedding_count_mismatch_display() {
        let err = EmbeddingError::CountMismatch {
            requested: 3,
            received: 2,
        };
        assert_eq!(
            err.to_string(),
            "Embedding count mismatch: requested 3, received 2"
        );
    }
}
