use async_trait::async_trait;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointStruct, ScoredPoint, SearchPointsBuilder,
    UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use tracing::instrument;
use uuid::Uuid;

use crate::domain::{
    ports::VectorStore, ChunkMetadata, DocumentChunk, DomainError, Embedding, SearchResult,
};
use crate::infrastructure::config::VectorDbConfig;

fn qdrant_err(e: impl std::fmt::Display) -> DomainError {
    DomainError::external(format!("vector database: {e}"))
}

pub struct QdrantVectorStore {
    client: Qdrant,
    collection: String,
    dimension: usize,
}

impl QdrantVectorStore {
    /// Connects and creates the collection when it does not exist yet.
    pub async fn connect(config: &VectorDbConfig, dimension: usize) -> Result<Self, DomainError> {
        let mut builder = Qdrant::from_url(&config.url());
        if let Some(key) = &config.api_key {
            builder = builder.api_key(key.clone());
        }
        let client = builder.build().map_err(qdrant_err)?;

        let store = Self {
            client,
            collection: config.collection.clone(),
            dimension,
        };

        store.ensure_collection().await?;

        Ok(store)
    }

    async fn ensure_collection(&self) -> Result<(), DomainError> {
        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(qdrant_err)?;

        if !exists {
            tracing::info!(collection = %self.collection, dimension = self.dimension, "creating collection");
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.collection).vectors_config(
                        VectorParamsBuilder::new(self.dimension as u64, Distance::Cosine),
                    ),
                )
                .await
                .map_err(qdrant_err)?;
        }

        Ok(())
    }

    fn to_point(chunk: &DocumentChunk, embedding: &Embedding) -> Result<PointStruct, DomainError> {
        let payload: Payload = serde_json::json!({
            "chunk_id": chunk.id.to_string(),
            "document_id": chunk.document_id.to_string(),
            "content": chunk.content,
            "chunk_index": chunk.chunk_index,
            "filename": chunk.metadata.filename,
            "content_type": chunk.metadata.content_type,
        })
        .try_into()
        .map_err(|_| DomainError::internal("Failed to create payload"))?;

        Ok(PointStruct::new(
            chunk.id.to_string(),
            embedding.as_slice().to_vec(),
            payload,
        ))
    }

    fn from_point(point: ScoredPoint) -> Option<SearchResult> {
        let payload = point.payload;
        let text = |key: &str| payload.get(key).and_then(|v| v.as_str()).cloned();

        let chunk = DocumentChunk {
            id: text("chunk_id")?.parse::<Uuid>().ok()?,
            document_id: text("document_id")?.parse::<Uuid>().ok()?,
            content: text("content")?,
            chunk_index: payload.get("chunk_index")?.as_integer()? as usize,
            metadata: ChunkMetadata {
                filename: text("filename").unwrap_or_default(),
                content_type: text("content_type").unwrap_or_default(),
            },
        };

        Some(SearchResult {
            chunk,
            score: point.score,
        })
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn upsert(&self, chunk: &DocumentChunk, embedding: &Embedding) -> Result<(), DomainError> {
        self.upsert_batch(&[(chunk.clone(), embedding.clone())]).await
    }

    #[instrument(skip(self, items), fields(collection = %self.collection, count = items.len()))]
    async fn upsert_batch(&self, items: &[(DocumentChunk, Embedding)]) -> Result<(), DomainError> {
        if items.is_empty() {
            return Ok(());
        }

        let points = items
            .iter()
            .map(|(chunk, embedding)| Self::to_point(chunk, embedding))
            .collect::<Result<Vec<_>, _>>()?;

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await
            .map_err(qdrant_err)?;

        Ok(())
    }

    #[instrument(skip(self, query), fields(collection = %self.collection))]
    async fn search(&self, query: &Embedding, top_k: usize) -> Result<Vec<SearchResult>, DomainError> {
        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, query.as_slice().to_vec(), top_k as u64)
                    .with_payload(true),
            )
            .await
            .map_err(qdrant_err)?;

        Ok(response
            .result
            .into_iter()
            .filter_map(Self::from_point)
            .collect())
    }

    async fn ping(&self) -> Result<(), DomainError> {
        self.client.health_check().await.map(|_| ()).map_err(qdrant_err)
    }
}
