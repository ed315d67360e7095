//! Application layer - use cases and orchestration.
//!
//! Services here combine the domain ports: ingesting uploaded documents,
//! tracking their progress and searching the indexed chunks.

pub mod services;

pub use services::{sanitize_filename, DocumentService, RagService, UploadService};
