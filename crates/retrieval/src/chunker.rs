//! Document Chunker
//!
//! Splits plain-text and markdown source documents into overlapping
//! character-window chunks, each tagged with the `{filename, page, title}`
//! metadata that citation formatting (`[filename pX]`) relies on.
//!
//! Sources carry no native pagination, so pages are derived: a form-feed
//! character is honored as an explicit page break, otherwise fixed-size
//! character pages are cut before chunking.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{RetrievalError, RetrievalResult};

/// Default chunk window, in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 900;

/// Default overlap carried between consecutive chunks, in characters.
pub const DEFAULT_OVERLAP: usize = 150;

/// Default derived-page size, in characters, for sources without form feeds.
pub const DEFAULT_PAGE_SIZE: usize = 3000;

/// Options controlling how documents are paged and chunked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingOptions {
    /// Maximum characters per chunk.
    pub chunk_size: usize,
    /// Overlapping characters between consecutive chunks.
    pub overlap: usize,
    /// Characters per derived page.
    pub page_size: usize,
}

impl Default for ChunkingOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// A source document to be chunked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDocument {
    /// Identifier derived from the file stem (e.g. "Finance_Guide").
    pub id: String,
    /// Original file name including extension.
    pub filename: String,
    /// Human-readable title (file stem with underscores spaced).
    pub title: String,
    /// Full text content.
    pub text: String,
}

impl SourceDocument {
    /// Create a document from raw parts.
    pub fn new(
        id: impl Into<String>,
        filename: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        let id = id.into();
        let title = id.replace('_', " ");
        Self {
            id,
            filename: filename.into(),
            title,
            text: text.into(),
        }
    }

    /// Read a document from a file on disk.
    pub fn from_path(path: &Path) -> RetrievalResult<Self> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| RetrievalError::internal(format!("bad file name: {:?}", path)))?
            .to_string();
        let filename = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or(&stem)
            .to_string();
        let text = std::fs::read_to_string(path)?;
        Ok(Self::new(stem, filename, text))
    }
}

/// A chunk produced by splitting a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocChunk {
    /// Unique chunk identifier: `{stem}-p{page}-c{index}`.
    pub chunk_id: String,
    /// Source file name.
    pub filename: String,
    /// Human-readable title of the source.
    pub title: String,
    /// 1-based page number within the source.
    pub page: i64,
    /// 0-based chunk index within the page.
    pub chunk_index: i64,
    /// Text content of this chunk.
    pub content: String,
}

/// Collapse all whitespace runs to single spaces and trim.
fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split text into pages.
///
/// Form feeds are honored as explicit page breaks; otherwise the text is cut
/// into fixed-size character pages.
fn paginate(text: &str, page_size: usize) -> Vec<String> {
    if text.contains('\u{000C}') {
        return text
            .split('\u{000C}')
            .map(normalize_whitespace)
            .collect();
    }

    let normalized = normalize_whitespace(text);
    if normalized.is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = normalized.chars().collect();
    chars
        .chunks(page_size.max(1))
        .map(|window| window.iter().collect())
        .collect()
}

/// Character-based splitter with overlap.
///
/// Windows are `chunk_size` characters; each window after the first starts
/// `overlap` characters before the previous window's end.
pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let n = chars.len();
    if n == 0 {
        return Vec::new();
    }

    let chunk_size = chunk_size.max(1);
    let overlap = overlap.min(chunk_size - 1);

    let mut chunks = Vec::new();
    let mut start = 0usize;
    loop {
        let end = (start + chunk_size).min(n);
        chunks.push(chars[start..end].iter().collect());
        if end == n {
            break;
        }
        start = end - overlap;
    }
    chunks
}

/// Split a document into metadata-tagged chunks.
pub fn chunk_document(doc: &SourceDocument, options: &ChunkingOptions) -> Vec<DocChunk> {
    let mut results = Vec::new();

    for (page_idx, page_text) in paginate(&doc.text, options.page_size).into_iter().enumerate() {
        if page_text.is_empty() {
            continue;
        }
        let page = (page_idx + 1) as i64;
        for (idx, content) in split_text(&page_text, options.chunk_size, options.overlap)
            .into_iter()
            .enumerate()
        {
            results.push(DocChunk {
                chunk_id: format!("{}-p{}-c{}", doc.id, page, idx),
                filename: doc.filename.clone(),
                title: doc.title.clone(),
                page,
                chunk_index: idx as i64,
                content,
            });
        }
    }

    results
}

/// Load all `.md` / `.markdown` / `.txt` documents from a directory, sorted
/// by file name.
pub fn load_text_documents(dir: &Path) -> RetrievalResult<Vec<SourceDocument>> {
    let mut paths: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && matches!(
                    p.extension().and_then(|e| e.to_str()),
                    Some("md") | Some("markdown") | Some("txt")
                )
        })
        .collect();
    paths.sort();

    paths.iter().map(|p| SourceDocument::from_path(p)).collect()
}
