use rig::completion::ToolDefinition;
use rig::tool::Tool;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::application::RagService;
use crate::domain::SearchResult;
use crate::infrastructure::config::KnowledgeBaseToolConfig;

#[derive(Debug, thiserror::Error)]
#[error("Knowledge base error: {0}")]
pub struct KnowledgeBaseError(pub String);

#[derive(Debug, Deserialize, Serialize)]
pub struct KnowledgeBaseArgs {
    pub query: String,
}

/// Lets the model run its own searches over the uploaded documents while it
/// is answering.
pub struct KnowledgeBaseTool {
    rag: Arc<RagService>,
    top_k: usize,
    config: KnowledgeBaseToolConfig,
}

impl KnowledgeBaseTool {
    pub fn new(rag: Arc<RagService>, top_k: usize, config: KnowledgeBaseToolConfig) -> Self {
        Self { rag, top_k, config }
    }

    fn format_results(&self, results: &[SearchResult]) -> String {
        if results.is_empty() {
            return self.config.no_results_message.clone();
        }

        results
            .iter()
            .enumerate()
            .map(|(i, r)| {
                format!(
                    "[{}] {} (chunk {}): {}",
                    i + 1,
                    r.chunk.metadata.filename,
                    r.chunk.chunk_index,
                    r.chunk.content
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

impl Tool for KnowledgeBaseTool {
    const NAME: &'static str = "knowledge_base";

    type Error = KnowledgeBaseError;
    type Args = KnowledgeBaseArgs;
    type Output = String;

    // rig dispatches tool calls by this name, so it must match the definition.
    fn name(&self) -> String {
        self.config.name.clone()
    }

    async fn definition(&self, _prompt: String) -> ToolDefinition {
        ToolDefinition {
            name: self.config.name.clone(),
            description: self.config.description.clone(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "What to look for in the uploaded documents"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        tracing::debug!(query = %args.query, "knowledge base tool call");

        let results = self
            .rag
            .retrieve_top_k(&args.query, self.top_k)
            .await
            .map_err(|e| KnowledgeBaseError(e.to_string()))?;

        Ok(self.format_results(&results))
    }
}
