pub mod agent;
pub mod config;
pub mod embedding;
pub mod executor;
pub mod llm;
pub mod memory;
pub mod parser;
pub mod telemetry;
pub mod tools;
pub mod vector_store;

pub use agent::{ChatAgent, ChatRun};
pub use config::{AppConfig, Config, PromptsConfig};
pub use embedding::TextEmbedding;
pub use executor::BlockingPool;
pub use llm::{KnowledgeToolSettings, OpenAiChatModel};
pub use memory::SqliteMemoryStore;
pub use parser::PdfParser;
pub use tools::KnowledgeBaseTool;
pub use vector_store::{InMemoryVectorStore, QdrantVectorStore};
