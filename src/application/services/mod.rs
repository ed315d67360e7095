mod document;
mod rag;
mod upload;

pub use document::DocumentService;
pub use rag::RagService;
pub use upload::{sanitize_filename, UploadService};
