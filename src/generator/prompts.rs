//! Prompt assembly for documentation generation.
//!
//! Per-chunk prompts combine the chunk's code with kind-specific
//! instructions and context gathered from sibling chunks in the same file.
//! Repository-level prompts work from a statistical summary so prompt size
//! stays bounded regardless of repository size.

use crate::types::{ChunkKind, CodeChunk};
use serde::Serialize;
use std::collections::BTreeMap;

/// Context assembled from the sibling chunks of one file
#[derive(Debug, Clone, Default)]
pub struct ChunkContext {
    /// Import statements found in the same file
    pub imports: Vec<String>,
    /// Number of method chunks in the same file
    pub method_count: usize,
}

impl ChunkContext {
    /// Gather context for `chunk` from all chunks sharing its path
    pub fn for_chunk(chunk: &CodeChunk, siblings: &[CodeChunk]) -> Self {
        let mut imports = Vec::new();
        let mut method_count = 0;
        for sibling in siblings.iter().filter(|s| s.path == chunk.path) {
            match sibling.kind {
                ChunkKind::Import => imports.push(sibling.content.clone()),
                ChunkKind::Method => method_count += 1,
                _ => {}
            }
        }
        Self {
            imports,
            method_count,
        }
    }
}

/// Aggregated statistics for repository-level documentation
#[derive(Debug, Clone, Serialize)]
pub struct RepositorySummary {
    pub full_name: String,
    pub total_files: usize,
    pub total_chunks: usize,
    pub languages: Vec<String>,
    /// Files with the most chunks, most dense first
    pub key_files: Vec<(String, usize)>,
    /// Sampled function and class names
    pub sampled_names: Vec<String>,
}

impl RepositorySummary {
    const KEY_FILES: usize = 10;
    const SAMPLED_NAMES: usize = 25;

    pub fn from_chunks(full_name: &str, chunks: &[CodeChunk]) -> Self {
        let mut per_file: BTreeMap<&str, usize> = BTreeMap::new();
        let mut languages: Vec<String> = Vec::new();
        let mut sampled_names = Vec::new();

        for chunk in chunks {
            *per_file.entry(chunk.path.as_str()).or_default() += 1;
            if !languages.contains(&chunk.language) {
                languages.push(chunk.language.clone());
            }
            if chunk.kind.is_documentable()
                && chunk.name != "anonymous"
                && sampled_names.len() < Self::SAMPLED_NAMES
            {
                sampled_names.push(chunk.name.clone());
            }
        }

        let mut key_files: Vec<(String, usize)> = per_file
            .into_iter()
            .map(|(path, count)| (path.to_string(), count))
            .collect();
        let total_files = key_files.len();
        key_files.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        key_files.truncate(Self::KEY_FILES);

        Self {
            full_name: full_name.to_string(),
            total_files,
            total_chunks: chunks.len(),
            languages,
            key_files,
            sampled_names,
        }
    }
}

pub fn chunk_prompt(chunk: &CodeChunk, context: &ChunkContext) -> String {
    let instructions = match chunk.kind {
        ChunkKind::Class => {
            "Document this class in markdown: describe its purpose, constructor, \
             properties, and methods, and include a short usage example."
        }
        ChunkKind::Method => {
            "Document this method in markdown: describe its purpose, parameters, \
             return value, errors it can raise, and include a short example."
        }
        _ => {
            "Document this function in markdown: describe its purpose, parameters, \
             return value, errors it can raise, and include a short example."
        }
    };

    let mut prompt = String::new();
    prompt.push_str(instructions);
    prompt.push_str("\n\n");

    if !context.imports.is_empty() {
        prompt.push_str("Imports in this file:\n");
        for import in &context.imports {
            prompt.push_str(import);
            prompt.push('\n');
        }
        prompt.push('\n');
    }

    if let Some(doc) = &chunk.docstring {
        prompt.push_str("Existing documentation comment:\n");
        prompt.push_str(doc);
        prompt.push_str("\n\n");
    }

    if chunk.kind == ChunkKind::Class && context.method_count > 0 {
        prompt.push_str(&format!(
            "The class defines {} methods.\n\n",
            context.method_count
        ));
    }

    prompt.push_str(&format!(
        "{} `{}` from `{}` ({}):\n\n```{}\n{}\n```\n",
        capitalize(chunk.kind.as_str()),
        chunk.name,
        chunk.path,
        chunk.language,
        chunk.language,
        chunk.content
    ));
    prompt
}

pub fn module_prompt(path: &str, chunks: &[CodeChunk]) -> String {
    let mut prompt = format!(
        "Write markdown module documentation for the file `{}`. Summarize its \
         responsibility and describe its public surface.\n\nDeclarations:\n",
        path
    );
    for chunk in chunks {
        prompt.push_str(&format!(
            "- {} `{}` (lines {}-{})\n",
            chunk.kind, chunk.name, chunk.start_line, chunk.end_line
        ));
    }
    prompt
}

pub fn readme_prompt(summary: &RepositorySummary) -> String {
    format!(
        "Write a README in markdown for the repository `{}`. Cover purpose, \
         structure, and how to get started.\n\n{}",
        summary.full_name,
        summary_block(summary)
    )
}

pub fn architecture_prompt(summary: &RepositorySummary) -> String {
    format!(
        "Write an architecture overview in markdown for the repository `{}`. \
         Describe the main components and how they interact.\n\n{}",
        summary.full_name,
        summary_block(summary)
    )
}

fn summary_block(summary: &RepositorySummary) -> String {
    let key_files: Vec<String> = summary
        .key_files
        .iter()
        .map(|(path, count)| format!("- {} ({} declarations)", path, count))
        .collect();
    format!(
        "Repository statistics:\n- {} source files, {} code units\n- Languages: {}\n\n\
         Key files:\n{}\n\nSampled declarations: {}\n",
        summary.total_files,
        summary.total_chunks,
        summary.languages.join(", "),
        key_files.join("\n"),
        summary.sampled_names.join(", ")
    )
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
