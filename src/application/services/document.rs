use std::sync::Arc;
use tracing::instrument;

use crate::application::RagService;
use crate::domain::{chunk_content, ports::DocumentParser, Document, DomainError};
use crate::infrastructure::executor::BlockingPool;

/// Adds stored files to the knowledge base: parse, chunk, embed, index.
pub struct DocumentService {
    parser: Arc<dyn DocumentParser>,
    rag: Arc<RagService>,
    pool: BlockingPool,
    chunk_size: usize,
}

impl DocumentService {
    pub fn new(
        parser: Arc<dyn DocumentParser>,
        rag: Arc<RagService>,
        pool: BlockingPool,
        chunk_size: usize,
    ) -> Self {
        Self {
            parser,
            rag,
            pool,
            chunk_size,
        }
    }

    /// Returns the number of chunks indexed. Parsing runs on the blocking
    /// pool; a document without text is an error and indexes nothing.
    #[instrument(skip(self, document), fields(file_id = %document.id, filename = %document.name))]
    pub async fn add_document(&self, document: &Document) -> Result<usize, DomainError> {
        let bytes = tokio::fs::read(&document.path).await?;

        let parser = self.parser.clone();
        let doc = document.clone();
        let chunk_size = self.chunk_size;
        let chunks = self
            .pool
            .run(move || {
                let text = parser.extract_text(&bytes)?;
                Ok(chunk_content(&doc, &text, chunk_size))
            })
            .await?;

        if chunks.is_empty() {
            return Err(DomainError::parse("document contains no extractable text"));
        }

        self.rag.index_chunks(&chunks).await?;
        tracing::info!(chunks = chunks.len(), "document indexed");
        Ok(chunks.len())
    }
}
