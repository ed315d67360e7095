use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::infrastructure::config::{Config, LogFormat};

pub fn default_filter(config: &Config) -> String {
    let level = if config.app.debug { "debug" } else { "info" };
    format!("pdf_bot={level},tower_http={level}")
}

/// `RUST_LOG` wins over the level derived from `DEBUG`.
pub fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(config).into());
    let registry = tracing_subscriber::registry().with(filter);

    match config.logging.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}
