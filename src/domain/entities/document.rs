use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// An uploaded file. `id` is the `file_id` handed back to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub name: String,
    pub content_type: String,
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
}

impl Document {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::with_id(Uuid::new_v4(), name, path)
    }

    pub fn with_id(id: Uuid, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id,
            name: name.into(),
            content_type: PDF_CONTENT_TYPE.to_string(),
            path: path.into(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: Uuid,
    pub document_id: Uuid,
    pub content: String,
    pub chunk_index: usize,
    pub metadata: ChunkMetadata,
}

impl DocumentChunk {
    pub fn new(document_id: Uuid, content: impl Into<String>, chunk_index: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            content: content.into(),
            chunk_index,
            metadata: ChunkMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: ChunkMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Provenance stored alongside each vector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub filename: String,
    pub content_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk: DocumentChunk,
    pub score: f32,
}

/// Splits extracted document text into chunks of at most `chunk_size`
/// characters.
///
/// Paragraphs (blank-line separated) are joined until the next one would
/// exceed `chunk_size`. A paragraph longer than `chunk_size` is cut at the
/// last whitespace inside the limit, or at the limit itself when it has none.
/// Chunk indexes are sequential from 0.
pub fn chunk_content(document: &Document, content: &str, chunk_size: usize) -> Vec<DocumentChunk> {
    let chunk_size = chunk_size.max(1);
    let metadata = ChunkMetadata {
        filename: document.name.clone(),
        content_type: document.content_type.clone(),
    };

    let mut pieces: Vec<String> = Vec::new();
    let mut current = String::new();

    let paragraphs = content
        .split("\n\n")
        .map(str::trim)
        .filter(|s| !s.is_empty());

    for paragraph in paragraphs {
        let paragraph_len = paragraph.chars().count();

        if paragraph_len > chunk_size {
            if !current.is_empty() {
                pieces.push(std::mem::take(&mut current));
            }
            let mut parts = split_long(paragraph, chunk_size);
            if let Some(last) = parts.pop() {
                pieces.extend(parts.into_iter().map(str::to_string));
                current.push_str(last);
            }
            continue;
        }

        let would_exceed =
            !current.is_empty() && current.chars().count() + paragraph_len + 2 > chunk_size;

        if would_exceed {
            pieces.push(std::mem::take(&mut current));
        }

        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(paragraph);
    }

    if !current.is_empty() {
        pieces.push(current);
    }

    pieces
        .into_iter()
        .enumerate()
        .map(|(index, text)| {
            DocumentChunk::new(document.id, text, index).with_metadata(metadata.clone())
        })
        .collect()
}

fn split_long(text: &str, chunk_size: usize) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut rest = text;

    while rest.chars().count() > chunk_size {
        let limit = rest
            .char_indices()
            .nth(chunk_size)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let cut = rest[..limit]
            .rfind(char::is_whitespace)
            .filter(|&i| i > 0)
            .unwrap_or(limit);

        parts.push(rest[..cut].trim_end());
        rest = rest[cut..].trim_start();
    }

    if !rest.is_empty() {
        parts.push(rest);
    }

    parts
}
