/// Configuration for the documentation pipeline
///
/// Loaded from a TOML file with serde defaults for every field, plus
/// environment variable overrides for provider credentials.
use crate::error::ConfigError;
use crate::retry::BackoffPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Embedding batcher configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Documentation generator configuration
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Job queue configuration
    #[serde(default)]
    pub queue: QueueConfig,

    /// Vector store configuration
    #[serde(default)]
    pub vector_store: VectorStoreConfig,

    /// Chunk extraction configuration
    #[serde(default)]
    pub chunking: ChunkingConfig,
}

/// Embedding provider and batching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// API key; when absent the batcher degrades to placeholder embeddings
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL of the embeddings API
    #[serde(default = "default_embedding_base_url")]
    pub base_url: String,

    /// Embedding model name
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Vector dimensionality, fixed per model
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    /// Maximum texts per embedding request
    #[serde(default = "default_max_batch")]
    pub max_batch: usize,

    /// Delay between consecutive batches, in milliseconds
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,

    /// Total attempt budget for rate-limited requests
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial retry delay, in milliseconds
    #[serde(default = "default_embed_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// HTTP request timeout, in seconds
    #[serde(default = "default_embed_timeout_secs")]
    pub timeout_secs: u64,
}

/// Generation provider and batch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// API key; when absent every generation is recorded as a failed result
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL of the generation API
    #[serde(default = "default_generation_base_url")]
    pub base_url: String,

    /// Generation model name
    #[serde(default = "default_generation_model")]
    pub model: String,

    /// Chunks generated concurrently within one group
    #[serde(default = "default_group_size")]
    pub group_size: usize,

    /// Delay between concurrent groups, in milliseconds
    #[serde(default = "default_group_delay_ms")]
    pub group_delay_ms: u64,

    /// Total attempt budget for rate-limited/overloaded requests
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial retry delay, in milliseconds
    #[serde(default = "default_gen_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Output token budget for per-chunk and per-module docs
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Output token budget for repository-level docs (README, architecture)
    #[serde(default = "default_repo_max_output_tokens")]
    pub repo_max_output_tokens: u32,

    /// HTTP request timeout, in seconds
    #[serde(default = "default_gen_timeout_secs")]
    pub timeout_secs: u64,
}

/// Job queue retry, lease, and retention configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Total attempt budget per job, including the first run
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial retry delay, in milliseconds
    #[serde(default = "default_queue_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Backoff multiplier per retry
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Lease duration for an active job; expired leases return to waiting
    #[serde(default = "default_lease_secs")]
    pub lease_secs: u64,

    /// Completed jobs older than this are evicted
    #[serde(default = "default_completed_retention_hours")]
    pub completed_retention_hours: u64,

    /// At most this many completed jobs are retained
    #[serde(default = "default_completed_max")]
    pub completed_max: usize,

    /// Failed jobs are kept longer for postmortem inspection
    #[serde(default = "default_failed_retention_days")]
    pub failed_retention_days: u64,
}

/// Vector store adapter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    /// Maximum records per upsert call
    #[serde(default = "default_upsert_batch")]
    pub upsert_batch: usize,

    /// Characters of chunk content stored in vector metadata
    #[serde(default = "default_snippet_chars")]
    pub snippet_chars: usize,
}

/// Chunk extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum tree depth visited by the extractor walk
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Minimum `end_line - start_line` for a chunk to be kept
    #[serde(default = "default_min_line_span")]
    pub min_line_span: usize,
}

// Default value functions

fn default_embedding_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_dimensions() -> usize {
    1536
}

fn default_max_batch() -> usize {
    2048
}

fn default_batch_delay_ms() -> u64 {
    200
}

fn default_max_attempts() -> u32 {
    3
}

fn default_embed_backoff_ms() -> u64 {
    1000
}

fn default_embed_timeout_secs() -> u64 {
    30
}

fn default_generation_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_generation_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_group_size() -> usize {
    5
}

fn default_group_delay_ms() -> u64 {
    1000
}

fn default_gen_backoff_ms() -> u64 {
    2000
}

fn default_max_output_tokens() -> u32 {
    2000
}

fn default_repo_max_output_tokens() -> u32 {
    4000
}

fn default_gen_timeout_secs() -> u64 {
    60
}

fn default_queue_backoff_ms() -> u64 {
    5000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_lease_secs() -> u64 {
    300
}

fn default_completed_retention_hours() -> u64 {
    24
}

fn default_completed_max() -> usize {
    1000
}

fn default_failed_retention_days() -> u64 {
    7
}

fn default_upsert_batch() -> usize {
    100
}

fn default_snippet_chars() -> usize {
    500
}

fn default_max_depth() -> usize {
    3
}

fn default_min_line_span() -> usize {
    2
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_embedding_base_url(),
            model: default_embedding_model(),
            dimensions: default_dimensions(),
            max_batch: default_max_batch(),
            batch_delay_ms: default_batch_delay_ms(),
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_embed_backoff_ms(),
            timeout_secs: default_embed_timeout_secs(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_generation_base_url(),
            model: default_generation_model(),
            group_size: default_group_size(),
            group_delay_ms: default_group_delay_ms(),
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_gen_backoff_ms(),
            max_output_tokens: default_max_output_tokens(),
            repo_max_output_tokens: default_repo_max_output_tokens(),
            timeout_secs: default_gen_timeout_secs(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_queue_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            lease_secs: default_lease_secs(),
            completed_retention_hours: default_completed_retention_hours(),
            completed_max: default_completed_max(),
            failed_retention_days: default_failed_retention_days(),
        }
    }
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            upsert_batch: default_upsert_batch(),
            snippet_chars: default_snippet_chars(),
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            min_line_span: default_min_line_span(),
        }
    }
}

impl EmbeddingConfig {
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.initial_backoff_ms),
            2.0,
        )
    }
}

impl GenerationConfig {
    pub fn group_delay(&self) -> Duration {
        Duration::from_millis(self.group_delay_ms)
    }

    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.initial_backoff_ms),
            2.0,
        )
    }
}

impl QueueConfig {
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.initial_backoff_ms),
            self.backoff_multiplier,
        )
    }

    pub fn lease_duration(&self) -> Duration {
        Duration::from_secs(self.lease_secs)
    }
}

impl Config {
    /// Build configuration from defaults and environment overrides
    pub fn new() -> Result<Self, ConfigError> {
        let mut config = Config::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, then apply environment overrides
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::LoadFailed(format!("{}: {}", path.as_ref().display(), e)))?;
        let mut config: Config =
            toml::from_str(&raw).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Environment variables win over file values for credentials and URLs
    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("EMBEDDING_API_KEY") {
            if !key.is_empty() {
                self.embedding.api_key = Some(key);
            }
        }
        if let Ok(key) = std::env::var("GENERATION_API_KEY") {
            if !key.is_empty() {
                self.generation.api_key = Some(key);
            }
        }
        if let Ok(url) = std::env::var("EMBEDDING_BASE_URL") {
            if !url.is_empty() {
                self.embedding.base_url = url;
            }
        }
        if let Ok(url) = std::env::var("GENERATION_BASE_URL") {
            if !url.is_empty() {
                self.generation.base_url = url;
            }
        }
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.embedding.dimensions == 0 {
            return Err(ConfigError::InvalidValue {
                key: "embedding.dimensions".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.embedding.max_batch == 0 {
            return Err(ConfigError::InvalidValue {
                key: "embedding.max_batch".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.generation.group_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "generation.group_size".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.queue.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "queue.max_attempts".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.vector_store.upsert_batch == 0 {
            return Err(ConfigError::InvalidValue {
                key: "vector_store.upsert_batch".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.embedding.dimensions, 1536);
        assert_eq!(config.embedding.max_batch, 2048);
        assert_eq!(config.generation.group_size, 5);
        assert_eq!(config.queue.max_attempts, 3);
        assert_eq!(config.queue.initial_backoff_ms, 5000);
        assert_eq!(config.queue.completed_max, 1000);
        assert_eq!(config.vector_store.upsert_batch, 100);
        assert_eq!(config.chunking.max_depth, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_toml() {
        let raw = r#"
[embedding]
dimensions = 384
model = "text-embedding-3-large"

[generation]
group_size = 2
"#;
        let config: Config = toml::from_str(raw).unwrap();
        assert_eq!(config.embedding.dimensions, 384);
        assert_eq!(config.embedding.model, "text-embedding-3-large");
        assert_eq!(config.generation.group_size, 2);
        // untouched sections keep defaults
        assert_eq!(config.queue.max_attempts, 3);
    }

    #[test]
    fn test_validate_rejects_zero_dimensions() {
        let mut config = Config::default();
        config.embedding.dimensions = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_backoff_policies_from_config() {
        let config = Config::default();
        let queue = config.queue.backoff();
        assert_eq!(queue.max_attempts, 3);
        assert_eq!(queue.initial_delay, Duration::from_millis(5000));
        assert_eq!(queue.delay_for(2), Duration::from_millis(10000));

        let generation = config.generation.backoff();
        assert_eq!(generation.initial_delay, Duration::from_millis(2000));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load("/nonexistent/docgen.toml").unwrap_err();
        assert!(matches!(err, ConfigError::LoadFailed(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docgen.toml");
        std::fs::write(&path, "[queue]\nmax_attempts = 5\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.queue.max_attempts, 5);
    }
}
