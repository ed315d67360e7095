use std::sync::Arc;

use crate::application::UploadService;
use crate::domain::ports::{MemoryStore, VectorStore};
use crate::infrastructure::{AppConfig, ChatAgent};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub uploads: Arc<UploadService>,
    pub agent: Arc<ChatAgent>,
    pub memory: Arc<dyn MemoryStore>,
    pub vector_store: Arc<dyn VectorStore>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        uploads: Arc<UploadService>,
        agent: Arc<ChatAgent>,
        memory: Arc<dyn MemoryStore>,
        vector_store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            uploads,
            agent,
            memory,
            vector_store,
        }
    }
}
