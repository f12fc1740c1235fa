//! Source-file access behind a trait, so the pipeline can analyze files
//! fetched from an API, a local checkout, or fixtures in tests.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[async_trait]
pub trait FileSource: Send + Sync {
    /// Relative paths of all source files, in stable order
    async fn list_files(&self) -> Result<Vec<String>>;

    async fn read_file(&self, path: &str) -> Result<String>;
}

/// Fixture-backed source for tests and single-shot runs
#[derive(Default)]
pub struct InMemoryFileSource {
    files: BTreeMap<String, String>,
}

impl InMemoryFileSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }
}

#[async_trait]
impl FileSource for InMemoryFileSource {
    async fn list_files(&self) -> Result<Vec<String>> {
        Ok(self.files.keys().cloned().collect())
    }

    async fn read_file(&self, path: &str) -> Result<String> {
        self.files
            .get(path)
            .cloned()
            .with_context(|| format!("no such file: {}", path))
    }
}

/// Source reading from a directory on disk
pub struct LocalFileSource {
    root: PathBuf,
    files: Vec<String>,
}

impl LocalFileSource {
    /// `files` are paths relative to `root`; listing is fixed at construction
    /// so an analysis run sees a stable file set.
    pub fn new(root: impl Into<PathBuf>, files: Vec<String>) -> Self {
        Self {
            root: root.into(),
            files,
        }
    }
}

#[async_trait]
impl FileSource for LocalFileSource {
    async fn list_files(&self) -> Result<Vec<String>> {
        Ok(self.files.clone())
    }

    async fn read_file(&self, path: &str) -> Result<String> {
        let full = self.root.join(path);
        tokio::fs::read_to_string(&full)
            .await
            .with_context(|| format!("reading {}", full.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_source_lists_sorted() {
        let source = InMemoryFileSource::new()
            .with_file("b.js", "x")
            .with_file("a.js", "y");
        assert_eq!(source.list_files().await.unwrap(), vec!["a.js", "b.js"]);
        assert_eq!(source.read_file("a.js").await.unwrap(), "y");
        assert!(source.read_file("missing.js").await.is_err());
    }

    #[tokio::test]
    async fn test_local_source_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.js"), "function x() {}").unwrap();
        let source = LocalFileSource::new(dir.path(), vec!["main.js".to_string()]);
        assert_eq!(
            source.read_file("main.js").await.unwrap(),
            "function x() {}"
        );
        assert!(source.read_file("gone.js").await.is_err());
    }
}
