//! Typed application settings.
//!
//! Settings come from environment variables (a `.env` file is loaded by the
//! binary before this runs); agent prompts come from an optional YAML file.
//! The resulting [`AppConfig`] is built once and handed to each component.

use serde::Deserialize;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("failed to read prompts file {path}: {source}")]
    PromptsIo {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse prompts file {path}: {source}")]
    PromptsYaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub config: Config,
    pub prompts: PromptsConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::from_env()?;
        let prompts = PromptsConfig::load(&config.prompts_path)?;
        Ok(Self { config, prompts })
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppSettings,
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub vector_db: VectorDbConfig,
    pub memory: MemoryConfig,
    pub upload: UploadConfig,
    pub rag: RagConfig,
    pub cors: CorsConfig,
    pub logging: LoggingConfig,
    pub ui: UiConfig,
    pub prompts_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct AppSettings {
    pub name: String,
    pub version: String,
    pub debug: bool,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub max_turns: usize,
    pub search_knowledge: bool,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("max_turns", &self.max_turns)
            .field("search_knowledge", &self.search_knowledge)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub model: String,
    pub dimension: usize,
}

#[derive(Clone)]
pub struct VectorDbConfig {
    pub host: String,
    pub port: u16,
    pub api_key: Option<String>,
    pub collection: String,
}

impl VectorDbConfig {
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl std::fmt::Debug for VectorDbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorDbConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("collection", &self.collection)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct MemoryConfig {
    pub db_path: PathBuf,
    pub history_limit: usize,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub dir: PathBuf,
    pub max_bytes: usize,
    pub chunk_size: usize,
    pub workers: usize,
}

#[derive(Debug, Clone)]
pub struct RagConfig {
    pub max_results: usize,
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("expected `text` or `json`, got `{other}`")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

#[derive(Debug, Clone)]
pub struct UiConfig {
    pub poll_interval_ms: u64,
    pub poll_max_attempts: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        Ok(Self {
            app: AppSettings {
                name: vars.string("APP_NAME", "PDF Bot"),
                version: vars.string("APP_VERSION", env!("CARGO_PKG_VERSION")),
                debug: vars.flag("DEBUG", false)?,
            },
            server: ServerConfig {
                host: vars.string("HOST", "0.0.0.0"),
                port: vars.parse("PORT", 8000)?,
            },
            llm: LlmConfig {
                api_key: vars.required("OPENAI_API_KEY")?,
                model: vars.string("LLM_MODEL", "gpt-4.1-nano"),
                max_turns: vars.parse("LLM_MAX_TURNS", 4)?,
                search_knowledge: vars.flag("SEARCH_KNOWLEDGE", true)?,
            },
            embedding: EmbeddingConfig {
                model: vars.string("EMBEDDING_MODEL", "text-embedding-3-small"),
                dimension: vars.positive("EMBEDDING_DIMENSION", 1536)?,
            },
            vector_db: VectorDbConfig {
                host: vars.string("VECTOR_DB_HOST", "localhost"),
                port: vars.parse("VECTOR_DB_PORT", 6334)?,
                api_key: vars.optional("VECTOR_DB_API_KEY"),
                collection: vars.string("VECTOR_DB_COLLECTION", "pdf_knowledge"),
            },
            memory: MemoryConfig {
                db_path: PathBuf::from(vars.string("MEMORY_DB_PATH", "pdf_bot.db")),
                history_limit: vars.parse("HISTORY_LIMIT", 20)?,
            },
            upload: UploadConfig {
                dir: PathBuf::from(vars.string("UPLOAD_DIR", "uploads")),
                max_bytes: vars.positive("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
                chunk_size: vars.positive("CHUNK_SIZE", 1000)?,
                workers: vars.positive("INGEST_WORKERS", 4)?,
            },
            rag: RagConfig {
                max_results: vars.positive("MAX_RESULTS", 10)?,
            },
            cors: CorsConfig {
                allowed_origins: vars
                    .string("CORS_ALLOWED_ORIGINS", "*")
                    .split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(String::from)
                    .collect(),
            },
            logging: LoggingConfig {
                format: vars.parse("LOG_FORMAT", LogFormat::Text)?,
            },
            ui: UiConfig {
                poll_interval_ms: vars.positive("UI_POLL_INTERVAL_MS", 5000)?,
                poll_max_attempts: vars.positive("UI_POLL_MAX_ATTEMPTS", 60)?,
            },
            prompts_path: PathBuf::from(vars.string("PROMPTS_PATH", "config/prompts.yaml")),
        })
    }
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn string(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn required(&self, key: &'static str) -> Result<String, ConfigError> {
        self.optional(key).ok_or(ConfigError::Missing(key))
    }

    fn parse<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.optional(key) {
            None => Ok(default),
            Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
                key,
                reason: e.to_string(),
                value,
            }),
        }
    }

    fn positive<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr + PartialOrd + Default,
        T::Err: Display,
    {
        let value = self.parse(key, default)?;
        if value > T::default() {
            Ok(value)
        } else {
            Err(ConfigError::Invalid {
                key,
                value: self.optional(key).unwrap_or_default(),
                reason: "must be greater than zero".into(),
            })
        }
    }

    fn flag(&self, key: &'static str, default: bool) -> Result<bool, ConfigError> {
        match self.optional(key) {
            None => Ok(default),
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::Invalid {
                    key,
                    value,
                    reason: "expected a boolean".into(),
                }),
            },
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    pub agent: AgentPrompts,
    pub tools: ToolsConfig,
}

impl PromptsConfig {
    /// Reads prompt overrides from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "prompts file not found, using defaults");
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::PromptsIo {
            path: path.to_path_buf(),
            source,
        })?;

        serde_yaml::from_str(&raw).map_err(|source| ConfigError::PromptsYaml {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentPrompts {
    pub system: String,
}

impl Default for AgentPrompts {
    fn default() -> Self {
        Self {
            system: "You are a helpful assistant that answers questions about uploaded PDF \
                     documents. Ground your answers in the provided document excerpts, say so \
                     when the documents do not contain the answer, and keep answers concise."
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub knowledge_base: KnowledgeBaseToolConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KnowledgeBaseToolConfig {
    pub name: String,
    pub description: String,
    pub no_results_message: String,
}

impl Default for KnowledgeBaseToolConfig {
    fn default() -> Self {
        Self {
            name: "knowledge_base".to_string(),
            description: "Search the uploaded PDF documents for passages relevant to a query."
                .to_string(),
            no_results_message: "No relevant documents found.".to_string(),
        }
    }
}
