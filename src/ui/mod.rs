//! Browser chat page served at `/ui`.

use axum::{extract::State, response::Html};
use minijinja::{context, Environment};

use crate::api::{ApiError, AppState};
use crate::infrastructure::AppConfig;

const CHAT_TEMPLATE: &str = include_str!("chat.html");

/// Client-side size guard; the server enforces its own limit.
pub const CLIENT_MAX_FILE_BYTES: usize = 10 * 1024 * 1024;

pub fn render_chat_page(config: &AppConfig) -> Result<String, minijinja::Error> {
    let mut env = Environment::new();
    env.add_template("chat.html", CHAT_TEMPLATE)?;

    let settings = &config.config;
    env.get_template("chat.html")?.render(context! {
        app_name => settings.app.name,
        poll_interval_ms => settings.ui.poll_interval_ms,
        poll_max_attempts => settings.ui.poll_max_attempts,
        max_file_bytes => CLIENT_MAX_FILE_BYTES.min(settings.upload.max_bytes),
    })
}

pub async fn chat_page(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    render_chat_page(&state.config).map(Html).map_err(|e| {
        tracing::error!(error = %e, "failed to render chat page");
        ApiError::new(
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
            "Failed to render chat page",
        )
    })
}
