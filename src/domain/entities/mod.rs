mod conversation;
mod document;
mod embedding;
mod upload;

pub use conversation::{ChatTurn, MessageRole, Session};
pub use document::{chunk_content, ChunkMetadata, Document, DocumentChunk, SearchResult};
pub use embedding::Embedding;
pub use upload::{UploadRecord, UploadStatus};
