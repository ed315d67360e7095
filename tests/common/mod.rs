#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use futures::StreamExt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

use pdf_bot::api::{create_router, AppState};
use pdf_bot::application::{DocumentService, RagService, UploadService};
use pdf_bot::domain::ports::{
    ChatModel, ChatModelRequest, DocumentParser, EmbeddingService, MemoryStore, TokenStream,
};
use pdf_bot::domain::{ChatTurn, DomainError, Embedding};
use pdf_bot::infrastructure::{
    AppConfig, BlockingPool, ChatAgent, Config, InMemoryVectorStore, PromptsConfig,
    SqliteMemoryStore,
};

pub const BOUNDARY: &str = "pdfbot-test-boundary";

/// Hashed bag-of-words vectors so related texts land close together. Same
/// scheme as the crate's unit-test fake, which integration tests cannot see.
pub struct KeywordEmbedding;

impl KeywordEmbedding {
    const DIMENSION: usize = 512;

    fn vectorize(text: &str) -> Embedding {
        let mut vec = vec![0.0f32; Self::DIMENSION];
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
            vec[(hash % Self::DIMENSION as u64) as usize] += 1.0;
        }
        Embedding::new(vec)
    }
}

#[async_trait]
impl EmbeddingService for KeywordEmbedding {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
        Ok(Self::vectorize(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError> {
        Ok(texts.iter().map(|t| Self::vectorize(t)).collect())
    }

    fn dimension(&self) -> usize {
        Self::DIMENSION
    }
}

/// Echoes a fixed reply in word-sized fragments and keeps every request.
pub struct EchoModel {
    reply: String,
    pub requests: Mutex<Vec<ChatModelRequest>>,
}

impl EchoModel {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ChatModel for EchoModel {
    async fn stream_reply(&self, request: ChatModelRequest) -> Result<TokenStream, DomainError> {
        self.requests.lock().unwrap().push(request);
        let fragments: Vec<Result<String, DomainError>> = self
            .reply
            .split_inclusive(' ')
            .map(|s| Ok(s.to_string()))
            .collect();
        Ok(futures::stream::iter(fragments).boxed())
    }
}

/// Streams one fragment, then fails.
pub struct FailingModel;

#[async_trait]
impl ChatModel for FailingModel {
    async fn stream_reply(&self, _request: ChatModelRequest) -> Result<TokenStream, DomainError> {
        let items: Vec<Result<String, DomainError>> = vec![
            Ok("part".to_string()),
            Err(DomainError::external("boom")),
        ];
        Ok(futures::stream::iter(items).boxed())
    }
}

/// A memory database that is down.
pub struct UnavailableMemory;

impl UnavailableMemory {
    fn down<T>() -> Result<T, DomainError> {
        Err(DomainError::external("memory database: unavailable"))
    }
}

#[async_trait]
impl MemoryStore for UnavailableMemory {
    async fn ensure_session(&self, _session_id: &str) -> Result<bool, DomainError> {
        Self::down()
    }

    async fn append_turn(&self, _session_id: &str, _turn: &ChatTurn) -> Result<(), DomainError> {
        Self::down()
    }

    async fn recent_turns(
        &self,
        _session_id: &str,
        _limit: usize,
    ) -> Result<Vec<ChatTurn>, DomainError> {
        Self::down()
    }

    async fn ping(&self) -> Result<(), DomainError> {
        Self::down()
    }
}

/// Reads uploads as UTF-8 so tests control the extracted text.
pub struct Utf8Parser;

impl DocumentParser for Utf8Parser {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, DomainError> {
        String::from_utf8(bytes.to_vec()).map_err(|e| DomainError::parse(e.to_string()))
    }
}

pub struct TestApp {
    pub router: Router,
    pub model: Arc<EchoModel>,
    pub vectors: Arc<InMemoryVectorStore>,
    pub memory: Arc<SqliteMemoryStore>,
    _dir: TempDir,
}

pub async fn spawn_app(parser: Arc<dyn DocumentParser>) -> TestApp {
    spawn_app_with(parser, &[]).await
}

/// Ports to swap in place of the default echo model and SQLite memory.
#[derive(Default)]
pub struct Overrides {
    pub model: Option<Arc<dyn ChatModel>>,
    pub memory: Option<Arc<dyn MemoryStore>>,
}

pub async fn spawn_app_with(parser: Arc<dyn DocumentParser>, extra: &[(&str, &str)]) -> TestApp {
    spawn_app_overriding(parser, extra, Overrides::default()).await
}

pub async fn spawn_app_overriding(
    parser: Arc<dyn DocumentParser>,
    extra: &[(&str, &str)],
    overrides: Overrides,
) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let upload_dir = dir.path().join("uploads").display().to_string();

    let mut vars: Vec<(String, String)> = vec![
        ("OPENAI_API_KEY".into(), "sk-test".into()),
        ("UPLOAD_DIR".into(), upload_dir),
        ("CHUNK_SIZE".into(), "120".into()),
        ("MAX_RESULTS".into(), "3".into()),
    ];
    vars.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));

    let config = Config::from_lookup(|key| {
        vars.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    })
    .unwrap();
    let app_config = AppConfig {
        config,
        prompts: PromptsConfig::default(),
    };
    let settings = &app_config.config;

    let vectors = Arc::new(InMemoryVectorStore::new());
    let memory = Arc::new(SqliteMemoryStore::in_memory().await.unwrap());
    let rag = Arc::new(RagService::new(
        Arc::new(KeywordEmbedding),
        vectors.clone(),
        settings.rag.max_results,
    ));
    let documents = Arc::new(DocumentService::new(
        parser,
        rag.clone(),
        BlockingPool::new(settings.upload.workers),
        settings.upload.chunk_size,
    ));
    let uploads = Arc::new(UploadService::new(documents, &settings.upload.dir));

    let model = Arc::new(EchoModel::new("Based on the documents, the answer is yes."));
    let chat_model: Arc<dyn ChatModel> = overrides
        .model
        .unwrap_or_else(|| model.clone() as Arc<dyn ChatModel>);
    let chat_memory: Arc<dyn MemoryStore> = overrides
        .memory
        .unwrap_or_else(|| memory.clone() as Arc<dyn MemoryStore>);
    let agent = Arc::new(ChatAgent::new(
        chat_model,
        chat_memory.clone(),
        rag,
        &app_config,
    ));

    let state = AppState::new(app_config, uploads, agent, chat_memory, vectors.clone());

    TestApp {
        router: create_router(state),
        model,
        vectors,
        memory,
        _dir: dir,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn upload(&self, filename: &str, bytes: &[u8]) -> Response<Body> {
        self.send(
            Request::post("/api/upload/pdf")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(multipart_body("file", filename, bytes)))
                .unwrap(),
        )
        .await
    }

    pub async fn chat(&self, uri: &str, body: serde_json::Value) -> Response<Body> {
        self.send(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// Polls the status endpoint until the upload leaves `pending`/`processing`.
    pub async fn wait_for_upload(&self, file_id: &str) -> serde_json::Value {
        for _ in 0..200 {
            let body = json_body(self.get(&format!("/api/upload/status/{file_id}")).await).await;
            match body["status"].as_str() {
                Some("completed") | Some("failed") => return body,
                _ => tokio::time::sleep(Duration::from_millis(10)).await,
            }
        }
        panic!("upload {file_id} never finished");
    }
}

pub fn multipart_body(field: &str, filename: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
         Content-Type: application/pdf\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn text_body(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// A parsed server-sent event: optional name plus JSON payload.
#[derive(Debug)]
pub struct SseEvent {
    pub name: Option<String>,
    pub data: serde_json::Value,
}

pub fn parse_sse(raw: &str) -> Vec<SseEvent> {
    raw.split("\n\n")
        .filter_map(|block| {
            let mut name = None;
            let mut data = Vec::new();
            for line in block.lines() {
                if let Some(v) = line.strip_prefix("event:") {
                    name = Some(v.trim().to_string());
                } else if let Some(v) = line.strip_prefix("data:") {
                    data.push(v.trim_start());
                }
            }
            if data.is_empty() {
                return None;
            }
            Some(SseEvent {
                name,
                data: serde_json::from_str(&data.join("\n")).unwrap(),
            })
        })
        .collect()
}

pub fn assert_status(response: &Response<Body>, expected: StatusCode) {
    assert_eq!(response.status(), expected, "unexpected status");
}
