use std::sync::Arc;
use tracing::instrument;

use crate::domain::{
    ports::{EmbeddingService, VectorStore},
    DocumentChunk, DomainError, SearchResult,
};

/// Semantic search over indexed document chunks.
pub struct RagService {
    embedding: Arc<dyn EmbeddingService>,
    vector_store: Arc<dyn VectorStore>,
    default_top_k: usize,
}

impl RagService {
    pub fn new(
        embedding: Arc<dyn EmbeddingService>,
        vector_store: Arc<dyn VectorStore>,
        default_top_k: usize,
    ) -> Self {
        Self {
            embedding,
            vector_store,
            default_top_k,
        }
    }

    pub async fn retrieve(&self, query: &str) -> Result<Vec<SearchResult>, DomainError> {
        self.retrieve_top_k(query, self.default_top_k).await
    }

    #[instrument(skip(self, query))]
    pub async fn retrieve_top_k(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, DomainError> {
        if query.trim().is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let embedding = self.embedding.embed(query).await?;
        let results = self.vector_store.search(&embedding, top_k).await?;
        tracing::debug!(hits = results.len(), "retrieved context");
        Ok(results)
    }

    /// Embeds all chunks in one batch and stores them. Nothing is written
    /// when embedding fails.
    #[instrument(skip(self, chunks), fields(count = chunks.len()))]
    pub async fn index_chunks(&self, chunks: &[DocumentChunk]) -> Result<(), DomainError> {
        if chunks.is_empty() {
            return Ok(());
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        let embeddings = self.embedding.embed_batch(&texts).await?;

        let items: Vec<_> = chunks.iter().cloned().zip(embeddings).collect();
        self.vector_store.upsert_batch(&items).await
    }
}
