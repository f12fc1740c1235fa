//! AST-based chunk extraction.
//!
//! Parses a source file with tree-sitter and walks the tree depth-first,
//! capped at a shallow depth so the output is top-level and class-member
//! declarations rather than every sub-expression. Grammar node kinds are
//! normalized into the closed [`ChunkKind`] vocabulary per language.

mod language;

pub use language::Language;

use crate::config::ChunkingConfig;
use crate::error::ChunkingError;
use crate::types::{ChunkKind, CodeChunk};
use std::path::Path;
use tree_sitter::{Node, Parser};

pub struct ChunkExtractor {
    config: ChunkingConfig,
}

impl ChunkExtractor {
    pub fn new() -> Self {
        Self::with_config(ChunkingConfig::default())
    }

    pub fn with_config(config: ChunkingConfig) -> Self {
        Self { config }
    }

    /// Extract chunks from a file, resolving the language from its path.
    ///
    /// Unsupported extensions and parse failures yield zero chunks; a
    /// multi-file analysis pass must never abort on a single file.
    pub fn extract_file(&self, source: &str, path: &str) -> Vec<CodeChunk> {
        match self.try_extract_file(source, path) {
            Ok(chunks) => chunks,
            Err(err @ ChunkingError::UnsupportedLanguage(_)) => {
                tracing::debug!(path, "skipping file: {}", err);
                Vec::new()
            }
            Err(err) => {
                tracing::warn!(path, "skipping file: {}", err);
                Vec::new()
            }
        }
    }

    /// Fallible variant of [`extract_file`](Self::extract_file), for callers
    /// that need to distinguish why a file produced no chunks.
    pub fn try_extract_file(&self, source: &str, path: &str) -> Result<Vec<CodeChunk>, ChunkingError> {
        let language = Language::from_path(path).ok_or_else(|| {
            let extension = Path::new(path)
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("")
                .to_string();
            ChunkingError::UnsupportedLanguage(extension)
        })?;
        self.try_extract(source, language, path)
    }

    /// Extract semantic chunks from source text in a known language.
    ///
    /// Parse failures are logged and produce zero chunks.
    pub fn extract_chunks(&self, source: &str, language: Language, path: &str) -> Vec<CodeChunk> {
        match self.try_extract(source, language, path) {
            Ok(chunks) => chunks,
            Err(err) => {
                tracing::warn!(path, "skipping file: {}", err);
                Vec::new()
            }
        }
    }

    fn try_extract(
        &self,
        source: &str,
        language: Language,
        path: &str,
    ) -> Result<Vec<CodeChunk>, ChunkingError> {
        let mut parser = Parser::new();
        parser
            .set_language(&language.grammar())
            .map_err(|e| ChunkingError::GrammarLoadFailed {
                language: language.name().to_string(),
                reason: e.to_string(),
            })?;

        let tree = parser
            .parse(source, None)
            .ok_or_else(|| ChunkingError::ParseFailed(path.to_string()))?;

        let mut chunks = Vec::new();
        let root = tree.root_node();
        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            self.walk(child, source, language, path, 1, false, &mut chunks);
        }

        tracing::debug!(path, count = chunks.len(), "extracted chunks");
        Ok(chunks)
    }

    fn walk(
        &self,
        node: Node,
        source: &str,
        language: Language,
        path: &str,
        depth: usize,
        in_class: bool,
        out: &mut Vec<CodeChunk>,
    ) {
        if depth > self.config.max_depth {
            return;
        }

        if let Some(kind) = language.chunk_kind(node.kind()) {
            // Plain function kinds inside a class scope are methods
            let kind = if in_class && kind == ChunkKind::Function {
                ChunkKind::Method
            } else {
                kind
            };
            if let Some(chunk) = self.chunk_for_node(node, source, language, path, kind) {
                out.push(chunk);
            }
        }

        let child_in_class = in_class || language.is_class_scope(node.kind());
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.walk(child, source, language, path, depth + 1, child_in_class, out);
        }
    }

    fn chunk_for_node(
        &self,
        node: Node,
        source: &str,
        language: Language,
        path: &str,
        kind: ChunkKind,
    ) -> Option<CodeChunk> {
        // Tree-sitter rows are 0-indexed
        let start_line = node.start_position().row + 1;
        let end_line = node.end_position().row + 1;

        // Trivial spans are not worth embedding or documenting
        if end_line - start_line < self.config.min_line_span {
            return None;
        }

        let content = node_text(node, source)?;

        Some(CodeChunk {
            kind,
            name: chunk_name(node, source),
            content,
            docstring: preceding_comment(node, source),
            language: language.name().to_string(),
            path: path.to_string(),
            start_line,
            end_line,
        })
    }
}

impl Default for ChunkExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn node_text(node: Node, source: &str) -> Option<String> {
    node.utf8_text(source.as_bytes()).ok().map(|s| s.to_string())
}

/// Name from the `name` field child, else the first identifier child (one
/// declarator level deep), else "anonymous".
fn chunk_name(node: Node, source: &str) -> String {
    if let Some(name) = node
        .child_by_field_name("name")
        .and_then(|n| node_text(n, source))
    {
        return name;
    }

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind().ends_with("identifier") {
            if let Some(name) = node_text(child, source) {
                return name;
            }
        }
        // Variable declarations carry the identifier on the declarator child
        if let Some(name) = child
            .child_by_field_name("name")
            .and_then(|n| node_text(n, source))
        {
            return name;
        }
    }

    "anonymous".to_string()
}

/// The immediately preceding sibling, if it is a comment block.
/// Best-effort; no merging of multiple comment lines beyond the one node.
fn preceding_comment(node: Node, source: &str) -> Option<String> {
    let prev = node.prev_sibling()?;
    if prev.kind().contains("comment") {
        node_text(prev, source)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(source: &str, path: &str) -> Vec<CodeChunk> {
        ChunkExtractor::new().extract_file(source, path)
    }

    #[test]
    fn test_javascript_functions() {
        let source = r#"
function first(a, b) {
  const sum = a + b;
  return sum;
}

function second(x) {
  return x * 2;
}
"#;
        let chunks = extract(source, "src/math.js");
        let functions: Vec<_> = chunks
            .iter()
            .filter(|c| c.kind == ChunkKind::Function)
            .collect();
        assert_eq!(functions.len(), 2);
        assert_eq!(functions[0].name, "first");
        assert_eq!(functions[1].name, "second");
        assert_eq!(functions[0].language, "javascript");
    }

    #[test]
    fn test_javascript_class_and_methods() {
        let source = r#"
class Greeter {
  constructor(name) {
    this.name = name;
  }

  greet(prefix) {
    const message = prefix + this.name;
    return message;
  }
}
"#;
        let chunks = extract(source, "src/greeter.js");
        let classes: Vec<_> = chunks.iter().filter(|c| c.kind == ChunkKind::Class).collect();
        let methods: Vec<_> = chunks
            .iter()
            .filter(|c| c.kind == ChunkKind::Method)
            .collect();
        assert_eq!(classes.len(), 1);
        assert_eq!(classes[0].name, "Greeter");
        assert_eq!(methods.len(), 2);
        assert!(methods.iter().any(|m| m.name == "greet"));
    }

    #[test]
    fn test_minimum_line_span_enforced() {
        let source = "function tiny() { return 1; }\n\nfunction alsoTiny(x) {\n  return x;\n}\n";
        let chunks = extract(source, "tiny.js");
        // First spans 1 line, second spans 3; only the second survives
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].name, "alsoTiny");
        for chunk in &chunks {
            assert!(chunk.end_line - chunk.start_line >= 2);
        }
    }

    #[test]
    fn test_python_class_methods() {
        let source = r#"
import os


class Processor:
    def run(self, items):
        for item in items:
            self.handle(item)

    def handle(self, item):
        print(item)
        return item


def standalone(value):
    result = value + 1
    return result
"#;
        let chunks = extract(source, "processor.py");
        assert!(chunks.iter().any(|c| c.kind == ChunkKind::Class && c.name == "Processor"));
        let methods: Vec<_> = chunks
            .iter()
            .filter(|c| c.kind == ChunkKind::Method)
            .collect();
        assert_eq!(methods.len(), 2);
        let functions: Vec<_> = chunks
            .iter()
            .filter(|c| c.kind == ChunkKind::Function)
            .collect();
        assert_eq!(functions.len(), 1);
        assert_eq!(functions[0].name, "standalone");
    }

    #[test]
    fn test_docstring_capture() {
        let source = r#"
// Adds two numbers together
// with no overflow handling
function add(a, b) {
  const out = a + b;
  return out;
}
"#;
        let chunks = extract(source, "add.js");
        assert_eq!(chunks.len(), 1);
        // Only the single adjacent comment block is captured
        assert_eq!(
            chunks[0].docstring.as_deref(),
            Some("// with no overflow handling")
        );
    }

    #[test]
    fn test_unsupported_extension_skipped() {
        let chunks = extract("some text\nmore text\n", "notes.txt");
        assert!(chunks.is_empty());

        let err = ChunkExtractor::new()
            .try_extract_file("some text\n", "notes.txt")
            .unwrap_err();
        assert!(matches!(err, ChunkingError::UnsupportedLanguage(ext) if ext == "txt"));
    }

    #[test]
    fn test_malformed_source_does_not_panic() {
        let source = "function ??? {{{ class ))) \u{0}\u{1}";
        let chunks = extract(source, "broken.js");
        // No assertion on count, only that extraction completes
        for chunk in chunks {
            assert!(chunk.end_line >= chunk.start_line);
        }
    }

    #[test]
    fn test_rust_impl_methods() {
        let source = r#"
use std::fmt;

struct Counter {
    value: u64,
    step: u64,
}

impl Counter {
    fn advance(&mut self) -> u64 {
        self.value += self.step;
        self.value
    }
}
"#;
        let chunks = extract(source, "counter.rs");
        assert!(chunks.iter().any(|c| c.kind == ChunkKind::Class && c.name == "Counter"));
        assert!(chunks.iter().any(|c| c.kind == ChunkKind::Method && c.name == "advance"));
    }

    #[test]
    fn test_typescript_interface() {
        let source = r#"
export interface Options {
  verbose: boolean;
  retries: number;
}
"#;
        let chunks = extract(source, "options.ts");
        assert!(chunks.iter().any(|c| c.kind == ChunkKind::Export));
        assert!(chunks.iter().any(|c| c.kind == ChunkKind::Class && c.name == "Options"));
    }

    #[test]
    fn test_anonymous_arrow_in_variable() {
        let source = r#"
const handler = (event) => {
  const data = event.payload;
  return data;
};
"#;
        let chunks = extract(source, "handler.js");
        let variable = chunks
            .iter()
            .find(|c| c.kind == ChunkKind::Variable)
            .expect("variable chunk");
        assert_eq!(variable.name, "handler");
    }

    #[test]
    fn test_content_is_exact_span() {
        let source = "function exact(a) {\n  return a;\n}\n";
        let chunks = extract(source, "exact.js");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "function exact(a) {\n  return a;\n}");
        assert_eq!(chunks[0].start_line, 1);
        assert_eq!(chunks[0].end_line, 3);
    }
}
