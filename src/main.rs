use pdf_bot::api::{create_router, AppState};
use pdf_bot::application::{DocumentService, RagService, UploadService};
use pdf_bot::domain::ports::EmbeddingService;
use pdf_bot::infrastructure::telemetry::init_tracing;
use pdf_bot::infrastructure::{
    AppConfig, BlockingPool, ChatAgent, KnowledgeToolSettings, OpenAiChatModel, PdfParser,
    QdrantVectorStore, SqliteMemoryStore, TextEmbedding,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let app_config = AppConfig::load()?;
    let config = &app_config.config;
    init_tracing(config);

    info!(app = %config.app.name, version = %config.app.version, "starting");

    let embedding = Arc::new(TextEmbedding::new(&config.llm.api_key, &config.embedding)?);
    let vector_store =
        Arc::new(QdrantVectorStore::connect(&config.vector_db, embedding.dimension()).await?);
    info!(url = %config.vector_db.url(), collection = %config.vector_db.collection, "vector database ready");

    let memory = Arc::new(SqliteMemoryStore::connect(&config.memory.db_path).await?);
    info!(path = %config.memory.db_path.display(), "memory database ready");

    let rag = Arc::new(RagService::new(
        embedding,
        vector_store.clone(),
        config.rag.max_results,
    ));

    let documents = Arc::new(DocumentService::new(
        Arc::new(PdfParser::new()),
        rag.clone(),
        BlockingPool::new(config.upload.workers),
        config.upload.chunk_size,
    ));
    let uploads = Arc::new(UploadService::new(documents, &config.upload.dir));
    uploads.prepare().await?;

    let mut model = OpenAiChatModel::new(&config.llm)?;
    if config.llm.search_knowledge {
        model = model.with_knowledge_tool(KnowledgeToolSettings {
            rag: rag.clone(),
            top_k: config.rag.max_results,
            config: app_config.prompts.tools.knowledge_base.clone(),
        });
    }

    let agent = Arc::new(ChatAgent::new(
        Arc::new(model),
        memory.clone(),
        rag,
        &app_config,
    ));

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    let state = AppState::new(app_config.clone(), uploads, agent, memory, vector_store);
    let app = create_router(state);

    info!("API server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
