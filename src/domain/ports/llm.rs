use crate::domain::{errors::DomainError, ChatTurn, SearchResult};
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Text fragments of a reply, in emission order. The stream ends after the
/// last fragment or after the first error.
pub type TokenStream = BoxStream<'static, Result<String, DomainError>>;

#[derive(Debug, Clone)]
pub struct ChatModelRequest {
    pub system_prompt: String,
    pub history: Vec<ChatTurn>,
    pub context: Vec<SearchResult>,
    pub message: String,
}

impl ChatModelRequest {
    pub fn new(system_prompt: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            history: Vec::new(),
            context: Vec::new(),
            message: message.into(),
        }
    }

    pub fn with_history(mut self, history: Vec<ChatTurn>) -> Self {
        self.history = history;
        self
    }

    pub fn with_context(mut self, context: Vec<SearchResult>) -> Self {
        self.context = context;
        self
    }

    /// The user prompt handed to the model: retrieved excerpts, then the
    /// previous conversation, then the current message.
    pub fn render_prompt(&self) -> String {
        if self.history.is_empty() && self.context.is_empty() {
            return self.message.clone();
        }

        let mut sections = Vec::new();

        if !self.context.is_empty() {
            let excerpts = self
                .context
                .iter()
                .enumerate()
                .map(|(i, r)| {
                    format!(
                        "[{}] ({}) {}",
                        i + 1,
                        r.chunk.metadata.filename,
                        r.chunk.content
                    )
                })
                .collect::<Vec<_>>()
                .join("\n\n");
            sections.push(format!("Relevant document excerpts:\n{excerpts}"));
        }

        if !self.history.is_empty() {
            let conversation = self
                .history
                .iter()
                .map(|t| format!("{}: {}", t.role.as_str(), t.content))
                .collect::<Vec<_>>()
                .join("\n");
            sections.push(format!("Previous conversation:\n{conversation}"));
        }

        sections.push(format!("Current message from user: {}", self.message));
        sections.join("\n\n")
    }
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn stream_reply(&self, request: ChatModelRequest) -> Result<TokenStream, DomainError>;
}
