use async_trait::async_trait;
use std::sync::RwLock;
use uuid::Uuid;

use crate::domain::{ports::VectorStore, DocumentChunk, DomainError, Embedding, SearchResult};

/// Brute-force cosine search over vectors held in process memory.
#[derive(Default)]
pub struct InMemoryVectorStore {
    entries: RwLock<Vec<(DocumentChunk, Embedding)>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn count_for_document(&self, document_id: Uuid) -> usize {
        self.entries
            .read()
            .map(|e| e.iter().filter(|(c, _)| c.document_id == document_id).count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(
        &self,
        chunk: &DocumentChunk,
        embedding: &Embedding,
    ) -> Result<(), DomainError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        entries.retain(|(c, _)| c.id != chunk.id);
        entries.push((chunk.clone(), embedding.clone()));
        Ok(())
    }

    async fn search(
        &self,
        query: &Embedding,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, DomainError> {
        let entries = self
            .entries
            .read()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        let mut results: Vec<SearchResult> = entries
            .iter()
            .map(|(chunk, embedding)| SearchResult {
                chunk: chunk.clone(),
                score: query.cosine_similarity(embedding),
            })
            .collect();

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(top_k);
        Ok(results)
    }

    async fn ping(&self) -> Result<(), DomainError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_and_search() {
        let store = InMemoryVectorStore::new();
        let doc_id = Uuid::new_v4();

        let near = DocumentChunk::new(doc_id, "near", 0);
        let far = DocumentChunk::new(doc_id, "far", 1);
        store
            .upsert(&far, &Embedding::new(vec![0.0, 1.0, 0.0]))
            .await
            .unwrap();
        store
            .upsert(&near, &Embedding::new(vec![1.0, 0.1, 0.0]))
            .await
            .unwrap();

        let results = store
            .search(&Embedding::new(vec![1.0, 0.0, 0.0]), 1)
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.content, "near");
        assert_eq!(store.len(), 2);
        assert_eq!(store.count_for_document(doc_id), 2);
    }

    #[tokio::test]
    async fn test_upsert_replaces_same_chunk() {
        let store = InMemoryVectorStore::new();
        let chunk = DocumentChunk::new(Uuid::new_v4(), "text", 0);

        store.upsert(&chunk, &Embedding::new(vec![1.0])).await.unwrap();
        store.upsert(&chunk, &Embedding::new(vec![0.5])).await.unwrap();

        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_search_empty_store() {
        let store = InMemoryVectorStore::new();
        let results = store.search(&Embedding::new(vec![1.0]), 5).await.unwrap();
        assert!(results.is_empty());
        assert!(store.is_empty());
    }
}
