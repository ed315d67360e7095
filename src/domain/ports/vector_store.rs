use crate::domain::{errors::DomainError, DocumentChunk, Embedding, SearchResult};
use async_trait::async_trait;

#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn upsert(&self, chunk: &DocumentChunk, embedding: &Embedding)
        -> Result<(), DomainError>;

    async fn upsert_batch(&self, items: &[(DocumentChunk, Embedding)]) -> Result<(), DomainError> {
        for (chunk, embedding) in items {
            self.upsert(chunk, embedding).await?;
        }
        Ok(())
    }

    async fn search(
        &self,
        query: &Embedding,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, DomainError>;

    async fn ping(&self) -> Result<(), DomainError>;
}
