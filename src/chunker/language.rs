use crate::types::ChunkKind;
use std::path::Path;

/// Languages the extractor can parse, resolved from file extension.
///
/// Files with any other extension are skipped rather than treated as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    JavaScript,
    TypeScript,
    Tsx,
    Python,
    Rust,
    Go,
    Java,
}

impl Language {
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_lowercase().as_str() {
            "js" | "mjs" | "cjs" | "jsx" => Some(Language::JavaScript),
            "ts" | "mts" | "cts" => Some(Language::TypeScript),
            "tsx" => Some(Language::Tsx),
            "py" | "pyi" => Some(Language::Python),
            "rs" => Some(Language::Rust),
            "go" => Some(Language::Go),
            "java" => Some(Language::Java),
            _ => None,
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Language::from_extension)
    }

    /// Lowercase language identifier stored on chunks and vector metadata
    pub fn name(&self) -> &'static str {
        match self {
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Tsx => "typescript",
            Language::Python => "python",
            Language::Rust => "rust",
            Language::Go => "go",
            Language::Java => "java",
        }
    }

    pub(crate) fn grammar(&self) -> tree_sitter::Language {
        match self {
            Language::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Language::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Language::Python => tree_sitter_python::LANGUAGE.into(),
            Language::Rust => tree_sitter_rust::LANGUAGE.into(),
            Language::Go => tree_sitter_go::LANGUAGE.into(),
            Language::Java => tree_sitter_java::LANGUAGE.into(),
        }
    }

    /// Total mapping from grammar node kinds to the canonical chunk
    /// vocabulary. Unlisted kinds are not chunk boundaries.
    pub fn chunk_kind(&self, node_kind: &str) -> Option<ChunkKind> {
        match self {
            Language::JavaScript | Language::TypeScript | Language::Tsx => match node_kind {
                "function_declaration"
                | "generator_function_declaration"
                | "function_expression"
                | "arrow_function" => Some(ChunkKind::Function),
                "method_definition" => Some(ChunkKind::Method),
                "class_declaration" | "class" | "abstract_class_declaration"
                | "interface_declaration" | "enum_declaration" => Some(ChunkKind::Class),
                "lexical_declaration" | "variable_declaration" => Some(ChunkKind::Variable),
                "import_statement" => Some(ChunkKind::Import),
                "export_statement" => Some(ChunkKind::Export),
                _ => None,
            },
            Language::Python => match node_kind {
                "function_definition" => Some(ChunkKind::Function),
                "class_definition" => Some(ChunkKind::Class),
                "import_statement" | "import_from_statement" | "future_import_statement" => {
                    Some(ChunkKind::Import)
                }
                _ => None,
            },
            Language::Rust => match node_kind {
                "function_item" => Some(ChunkKind::Function),
                "struct_item" | "enum_item" | "trait_item" | "impl_item" | "union_item" => {
                    Some(ChunkKind::Class)
                }
                "use_declaration" => Some(ChunkKind::Import),
                "const_item" | "static_item" => Some(ChunkKind::Variable),
                _ => None,
            },
            Language::Go => match node_kind {
                "function_declaration" => Some(ChunkKind::Function),
                "method_declaration" => Some(ChunkKind::Method),
                "type_declaration" => Some(ChunkKind::Class),
                "import_declaration" => Some(ChunkKind::Import),
                "var_declaration" | "const_declaration" => Some(ChunkKind::Variable),
                _ => None,
            },
            Language::Java => match node_kind {
                "method_declaration" | "constructor_declaration" => Some(ChunkKind::Method),
                "class_declaration" | "interface_declaration" | "enum_declaration"
                | "record_declaration" => Some(ChunkKind::Class),
                "import_declaration" => Some(ChunkKind::Import),
                "field_declaration" => Some(ChunkKind::Variable),
                _ => None,
            },
        }
    }

    /// Node kinds whose subtree turns plain functions into methods
    pub(crate) fn is_class_scope(&self, node_kind: &str) -> bool {
        match self {
            Language::JavaScript | Language::TypeScript | Language::Tsx => matches!(
                node_kind,
                "class_declaration" | "class" | "abstract_class_declaration"
            ),
            Language::Python => node_kind == "class_definition",
            Language::Rust => matches!(node_kind, "impl_item" | "trait_item"),
            Language::Java => matches!(
                node_kind,
                "class_declaration" | "interface_declaration" | "enum_declaration"
                    | "record_declaration"
            ),
            Language::Go => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_resolution() {
        assert_eq!(Language::from_extension("ts"), Some(Language::TypeScript));
        assert_eq!(Language::from_extension("TSX"), Some(Language::Tsx));
        assert_eq!(Language::from_extension("py"), Some(Language::Python));
        assert_eq!(Language::from_extension("md"), None);
        assert_eq!(Language::from_extension(""), None);
    }

    #[test]
    fn test_path_resolution() {
        assert_eq!(
            Language::from_path("src/lib/utils.mjs"),
            Some(Language::JavaScript)
        );
        assert_eq!(Language::from_path("README.md"), None);
        assert_eq!(Language::from_path("Makefile"), None);
    }

    #[test]
    fn test_javascript_mapping() {
        let lang = Language::JavaScript;
        assert_eq!(
            lang.chunk_kind("function_declaration"),
            Some(ChunkKind::Function)
        );
        assert_eq!(lang.chunk_kind("method_definition"), Some(ChunkKind::Method));
        assert_eq!(lang.chunk_kind("class_declaration"), Some(ChunkKind::Class));
        assert_eq!(lang.chunk_kind("import_statement"), Some(ChunkKind::Import));
        assert_eq!(lang.chunk_kind("export_statement"), Some(ChunkKind::Export));
        assert_eq!(
            lang.chunk_kind("lexical_declaration"),
            Some(ChunkKind::Variable)
        );
        assert_eq!(lang.chunk_kind("binary_expression"), None);
    }

    #[test]
    fn test_python_mapping() {
        let lang = Language::Python;
        assert_eq!(
            lang.chunk_kind("function_definition"),
            Some(ChunkKind::Function)
        );
        assert_eq!(lang.chunk_kind("class_definition"), Some(ChunkKind::Class));
        assert_eq!(
            lang.chunk_kind("import_from_statement"),
            Some(ChunkKind::Import)
        );
        assert_eq!(lang.chunk_kind("expression_statement"), None);
    }

    #[test]
    fn test_class_scope_detection() {
        assert!(Language::Python.is_class_scope("class_definition"));
        assert!(Language::JavaScript.is_class_scope("class_declaration"));
        assert!(Language::Rust.is_class_scope("impl_item"));
        assert!(!Language::Python.is_class_scope("function_definition"));
        assert!(!Language::Go.is_class_scope("type_declaration"));
    }
}
