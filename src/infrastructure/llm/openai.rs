use async_trait::async_trait;
use futures::StreamExt;
use rig::agent::MultiTurnStreamItem;
use rig::client::CompletionClient;
use rig::providers::openai;
use rig::streaming::{StreamedAssistantContent, StreamingPrompt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::instrument;

use crate::application::RagService;
use crate::domain::{
    ports::{ChatModel, ChatModelRequest, TokenStream},
    DomainError,
};
use crate::infrastructure::config::{KnowledgeBaseToolConfig, LlmConfig};
use crate::infrastructure::llm::receiver_stream;
use crate::infrastructure::tools::KnowledgeBaseTool;

const FRAGMENT_BUFFER: usize = 64;

/// What the model needs to search the documents on its own.
#[derive(Clone)]
pub struct KnowledgeToolSettings {
    pub rag: Arc<RagService>,
    pub top_k: usize,
    pub config: KnowledgeBaseToolConfig,
}

/// Streaming chat completions from OpenAI through a rig agent.
pub struct OpenAiChatModel {
    client: openai::Client,
    model: String,
    max_turns: usize,
    knowledge: Option<KnowledgeToolSettings>,
}

impl OpenAiChatModel {
    pub fn new(config: &LlmConfig) -> Result<Self, DomainError> {
        let client = openai::Client::new(&config.api_key)
            .map_err(|e| DomainError::external(format!("OpenAI client: {e}")))?;

        Ok(Self {
            client,
            model: config.model.clone(),
            max_turns: config.max_turns,
            knowledge: None,
        })
    }

    pub fn with_knowledge_tool(mut self, settings: KnowledgeToolSettings) -> Self {
        self.knowledge = Some(settings);
        self
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    #[instrument(skip(self, request), fields(model = %self.model, history = request.history.len(), context = request.context.len()))]
    async fn stream_reply(&self, request: ChatModelRequest) -> Result<TokenStream, DomainError> {
        let builder = self
            .client
            .agent(&self.model)
            .preamble(&request.system_prompt);

        let agent = match &self.knowledge {
            Some(k) => builder
                .tool(KnowledgeBaseTool::new(
                    k.rag.clone(),
                    k.top_k,
                    k.config.clone(),
                ))
                .build(),
            None => builder.build(),
        };

        let prompt = request.render_prompt();
        let max_turns = self.max_turns;
        let (tx, rx) = mpsc::channel(FRAGMENT_BUFFER);

        tokio::spawn(async move {
            let mut stream = agent.stream_prompt(prompt).multi_turn(max_turns).await;

            while let Some(item) = stream.next().await {
                let fragment = match item {
                    Ok(MultiTurnStreamItem::StreamAssistantItem(
                        StreamedAssistantContent::Text(text),
                    )) => Ok(text.text),
                    Ok(_) => continue,
                    Err(e) => Err(DomainError::external(format!("Agent failed: {e}"))),
                };

                let failed = fragment.is_err();
                if tx.send(fragment).await.is_err() || failed {
                    break;
                }
            }
        });

        Ok(receiver_stream(rx))
    }
}
