pub mod chat;
pub mod health;
pub mod upload;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::{middleware, routing::get, routing::post, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::middleware::request_logger;
use crate::api::state::AppState;
use crate::ui;

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn create_router(state: AppState) -> Router {
    let cors = build_cors(&state.config.config.cors.allowed_origins);
    let upload_limit = state.config.config.upload.max_bytes;

    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/ui", get(ui::chat_page))
        .merge(upload_routes(upload_limit))
        .merge(chat_routes())
        .layer(middleware::from_fn(request_logger))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn build_cors(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        cors.allow_origin(origins)
    }
}

fn upload_routes(limit: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/api/upload/pdf",
            post(upload::upload_pdf).layer(DefaultBodyLimit::max(limit + MULTIPART_OVERHEAD)),
        )
        .route("/api/upload/status/{file_id}", get(upload::upload_status))
        .route("/api/upload/list", get(upload::list_uploads))
}

fn chat_routes() -> Router<AppState> {
    Router::new()
        .route("/api/chat/stream", post(chat::chat_stream))
        .route("/api/chat", post(chat::chat_stream))
        .route("/api/chat/", post(chat::chat_stream))
}
