use serde::{Deserialize, Serialize};

/// Canonical chunk vocabulary shared by every supported language.
///
/// Language-specific grammar node kinds are normalized into this closed set
/// by the extractor, so downstream consumers never see raw node-kind strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    Function,
    Method,
    Class,
    Import,
    Export,
    Variable,
}

impl ChunkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkKind::Function => "function",
            ChunkKind::Method => "method",
            ChunkKind::Class => "class",
            ChunkKind::Import => "import",
            ChunkKind::Export => "export",
            ChunkKind::Variable => "variable",
        }
    }

    /// Whether chunks of this kind receive their own documentation entry
    pub fn is_documentable(&self) -> bool {
        matches!(
            self,
            ChunkKind::Function | ChunkKind::Method | ChunkKind::Class
        )
    }
}

impl std::fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A contiguous source-code span with semantic meaning
///
/// Chunks are created fresh per analysis run and never mutated; only the
/// derived embeddings and generated docs outlive the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeChunk {
    /// Normalized chunk kind
    pub kind: ChunkKind,
    /// Identifier, or "anonymous" when the node carries none
    pub name: String,
    /// Exact source substring spanned by the node
    pub content: String,
    /// Immediately preceding comment block, if adjacent
    pub docstring: Option<String>,
    /// Language identifier (e.g. "typescript")
    pub language: String,
    /// File path, for grouping and addressing
    pub path: String,
    /// Starting line, 1-based inclusive
    pub start_line: usize,
    /// Ending line, 1-based inclusive
    pub end_line: usize,
}

impl CodeChunk {
    /// Deterministic vector-store key, so re-analysis overwrites the prior
    /// vector for the same span instead of duplicating it.
    pub fn vector_key(&self, repository_id: &str) -> String {
        format!("{}-{}-{}", repository_id, self.path, self.start_line)
    }

    /// Number of source lines covered by this chunk
    pub fn line_span(&self) -> usize {
        self.end_line.saturating_sub(self.start_line)
    }

    /// Text submitted to the embedding provider for this chunk.
    ///
    /// Enriched with the docstring and structured name/kind lines, which
    /// improves retrieval relevance over raw code text alone.
    pub fn embedding_text(&self) -> String {
        let mut parts = Vec::with_capacity(4);
        if let Some(doc) = &self.docstring {
            parts.push(doc.clone());
        }
        parts.push(format!("Name: {}", self.name));
        parts.push(format!("Type: {}", self.kind));
        parts.push(self.content.clone());
        parts.join("\n")
    }
}

/// How an embedding vector was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingMode {
    /// External embedding API
    Real,
    /// Deterministic hash-based fallback, not semantically meaningful
    Placeholder,
}

impl EmbeddingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbeddingMode::Real => "real",
            EmbeddingMode::Placeholder => "placeholder",
        }
    }
}

/// Kind of documentation artifact produced by one generation call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocType {
    Function,
    Class,
    Module,
    Readme,
    Architecture,
}

impl DocType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocType::Function => "function",
            DocType::Class => "class",
            DocType::Module => "module",
            DocType::Readme => "readme",
            DocType::Architecture => "architecture",
        }
    }

    /// Doc type produced for a chunk of the given kind, if any
    pub fn for_chunk(kind: ChunkKind) -> Option<DocType> {
        match kind {
            ChunkKind::Function | ChunkKind::Method => Some(DocType::Function),
            ChunkKind::Class => Some(DocType::Class),
            _ => None,
        }
    }
}

/// Back-reference from a generated document to its source chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRef {
    pub path: String,
    pub name: String,
    pub start_line: usize,
}

impl ChunkRef {
    pub fn of(chunk: &CodeChunk) -> Self {
        Self {
            path: chunk.path.clone(),
            name: chunk.name.clone(),
            start_line: chunk.start_line,
        }
    }
}

/// Output of one generation call.
///
/// A failed generation is represented as a result with `documentation: None`
/// and a populated `error`, never as a thrown error out of a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Generated markdown, or None on failure
    pub documentation: Option<String>,
    pub doc_type: DocType,
    /// Source chunk for function/class docs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk: Option<ChunkRef>,
    /// Source file for module docs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub input_tokens: u64,
    pub output_tokens: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerationResult {
    pub fn is_success(&self) -> bool {
        self.documentation.is_some()
    }

    pub fn failed(doc_type: DocType, error: impl Into<String>) -> Self {
        Self {
            documentation: None,
            doc_type,
            chunk: None,
            file: None,
            input_tokens: 0,
            output_tokens: 0,
            error: Some(error.into()),
        }
    }
}
