//! Offline stand-ins for the OpenAI-backed ports, shared by unit tests.

use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Mutex;

use crate::domain::{
    ports::{ChatModel, ChatModelRequest, DocumentParser, EmbeddingService, TokenStream},
    DomainError, Embedding,
};
use crate::infrastructure::config::{AppConfig, Config, PromptsConfig};

pub fn test_app_config() -> AppConfig {
    let config = Config::from_lookup(|key| match key {
        "OPENAI_API_KEY" => Some("sk-test".to_string()),
        _ => None,
    })
    .expect("test config");

    AppConfig {
        config,
        prompts: PromptsConfig::default(),
    }
}

/// Bag-of-words vectors: each lowercase word increments a hashed bucket, so
/// texts sharing words score higher.
pub struct KeywordEmbedding {
    dimension: usize,
}

impl Default for KeywordEmbedding {
    fn default() -> Self {
        Self { dimension: 512 }
    }
}

impl KeywordEmbedding {
    fn vectorize(&self, text: &str) -> Embedding {
        let mut vec = vec![0.0f32; self.dimension];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let hash = word
                .to_lowercase()
                .bytes()
                .fold(0xcbf29ce484222325u64, |h, b| {
                    (h ^ b as u64).wrapping_mul(0x100000001b3)
                });
            vec[(hash % self.dimension as u64) as usize] += 1.0;
        }
        Embedding::new(vec)
    }
}

#[async_trait]
impl EmbeddingService for KeywordEmbedding {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
        Ok(self.vectorize(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError> {
        Ok(texts.iter().map(|t| self.vectorize(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Replies with fixed fragments and records every request it receives.
pub struct ScriptedChatModel {
    fragments: Vec<String>,
    error: Option<String>,
    requests: Mutex<Vec<ChatModelRequest>>,
}

impl ScriptedChatModel {
    pub fn replying(fragments: &[&str]) -> Self {
        Self {
            fragments: fragments.iter().map(|s| s.to_string()).collect(),
            error: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_after(fragments: &[&str], error: &str) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::replying(fragments)
        }
    }

    pub fn requests(&self) -> Vec<ChatModelRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedChatModel {
    async fn stream_reply(&self, request: ChatModelRequest) -> Result<TokenStream, DomainError> {
        self.requests.lock().unwrap().push(request);

        let mut items: Vec<Result<String, DomainError>> =
            self.fragments.iter().cloned().map(Ok).collect();
        if let Some(error) = &self.error {
            items.push(Err(DomainError::external(error.clone())));
        }
        Ok(futures::stream::iter(items).boxed())
    }
}

/// Treats the file bytes as UTF-8 text; fails on an `ERROR` marker.
pub struct PlainTextParser;

impl DocumentParser for PlainTextParser {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, DomainError> {
        let text = String::from_utf8(bytes.to_vec()).map_err(|e| DomainError::parse(e.to_string()))?;
        if text.starts_with("ERROR") {
            return Err(DomainError::parse("corrupt document"));
        }
        Ok(text)
    }
}
