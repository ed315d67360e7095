mod document_parser;
mod embedding;
mod llm;
mod memory_store;
mod vector_store;

pub use document_parser::DocumentParser;
pub use embedding::EmbeddingService;
pub use llm::{ChatModel, ChatModelRequest, TokenStream};
pub use memory_store::MemoryStore;
pub use vector_store::VectorStore;
