use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::api::state::AppState;

#[derive(Serialize)]
pub struct RootResponse {
    pub message: String,
    pub status: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub memory: String,
    pub vector_db: String,
}

pub async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    Json(RootResponse {
        message: format!("{} API is running", state.config.config.app.name),
        status: "ok".into(),
    })
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let app = &state.config.config.app;
    Json(HealthResponse {
        status: "healthy".into(),
        service: app.name.clone(),
        version: app.version.clone(),
    })
}

fn component(result: Result<(), crate::domain::DomainError>, name: &str) -> &'static str {
    match result {
        Ok(()) => "connected",
        Err(e) => {
            tracing::warn!(component = name, error = %e, "readiness probe failed");
            "disconnected"
        }
    }
}

pub async fn readiness_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let (memory, vector_db) = tokio::join!(state.memory.ping(), state.vector_store.ping());
    let memory = component(memory, "memory");
    let vector_db = component(vector_db, "vector_db");

    let is_ready = memory == "connected" && vector_db == "connected";

    let response = ReadinessResponse {
        status: if is_ready { "ready" } else { "not_ready" }.into(),
        memory: memory.into(),
        vector_db: vector_db.into(),
    };

    let status = if is_ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}
