//! Configuration for the embedding, vector store and generation services
//!
//! Loads configuration from config.yml file. Environment variables (and a `.env`
//! file) take precedence over values from the file. The resulting [`Config`] is
//! immutable and handed to each component at construction.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::{Error, Result};

/// Default constants (fallback if config.yml not found)
pub const CONFIG_FILE: &str = "config.yml";
pub const DEFAULT_WORKSPACE: &str = "default";
pub const DEFAULT_ENTITY_TOP_K: usize = 5;
pub const DEFAULT_RELATION_TOP_K: usize = 3;
pub const DEFAULT_DISTANCE_THRESHOLD: f64 = 0.6;
pub const DEFAULT_HISTORY_LIMIT: usize = 10;
pub const DEFAULT_MAX_INPUT_CHARS: usize = 8000;
pub const DEFAULT_EMBED_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_EMBEDDING_DIM: usize = 1024;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_EMBEDDING_MODEL: &str = "bge-m3";
pub const DEFAULT_AZURE_API_VERSION: &str = "2024-08-01-preview";
pub const DEFAULT_AZURE_DEPLOYMENT: &str = "gpt-4o-mini";

/// YAML config structures
#[derive(Debug, Default, Deserialize)]
struct YamlConfig {
    postgres: Option<PostgresYaml>,
    embedding: Option<EmbeddingYaml>,
    generation: Option<GenerationYaml>,
    retrieval: Option<RetrievalYaml>,
    chat: Option<ChatYaml>,
}

#[derive(Debug, Default, Deserialize)]
struct PostgresYaml {
    host: Option<String>,
    #[serde(default, deserialize_with = "deserialize_string_or_number")]
    port: Option<String>,
    user: Option<String>,
    #[serde(default, deserialize_with = "deserialize_string_or_number")]
    password: Option<String>,
    database: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct EmbeddingYaml {
    url: Option<String>,
    model: Option<String>,
    max_input_chars: Option<usize>,
    timeout_secs: Option<u64>,
    #[serde(default, deserialize_with = "deserialize_string_or_number")]
    dimension: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GenerationYaml {
    endpoint: Option<String>,
    api_key: Option<String>,
    api_version: Option<String>,
    deployment: Option<String>,
    temperature: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct RetrievalYaml {
    workspace: Option<String>,
    entity_top_k: Option<usize>,
    relation_top_k: Option<usize>,
    distance_threshold: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatYaml {
    history_limit: Option<usize>,
}

/// Deserialize a value that can be either a string or a number
fn deserialize_string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let value: Option<serde_yaml::Value> = Option::deserialize(deserializer)?;
    match value {
        None => Ok(None),
        Some(serde_yaml::Value::String(s)) => Ok(Some(s)),
        Some(serde_yaml::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected string or number, got {:?}",
            other
        ))),
    }
}

/// PostgreSQL connection parameters for the pgvector store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

/// Ollama embedding endpoint settings.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingConfig {
    pub url: String,
    pub model: String,
    /// Query text is cut to this many characters before embedding
    pub max_input_chars: usize,
    /// Wall-clock ceiling for a single embedding request
    pub timeout: Duration,
    /// Expected vector length; `None` disables the check
    pub dimension: Option<usize>,
}

/// Azure OpenAI chat deployment settings.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    pub endpoint: String,
    pub api_key: String,
    pub api_version: String,
    pub deployment: String,
    pub temperature: f32,
}

impl GenerationConfig {
    /// Both the endpoint and the key are present.
    pub fn is_configured(&self) -> bool {
        !self.endpoint.trim().is_empty() && !self.api_key.trim().is_empty()
    }
}

/// Context selection knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalConfig {
    /// Namespace (`workspace` column) searched in the vector store
    pub workspace: String,
    pub entity_top_k: usize,
    pub relation_top_k: usize,
    /// Hits with `distance >= distance_threshold` are dropped
    pub distance_threshold: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            workspace: DEFAULT_WORKSPACE.to_string(),
            entity_top_k: DEFAULT_ENTITY_TOP_K,
            relation_top_k: DEFAULT_RELATION_TOP_K,
            distance_threshold: DEFAULT_DISTANCE_THRESHOLD,
        }
    }
}

/// Main configuration struct
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub store: StoreConfig,
    pub embedding: EmbeddingConfig,
    pub generation: GenerationConfig,
    pub retrieval: RetrievalConfig,
    pub history_limit: usize,
}

impl Config {
    /// Load configuration from config.yml (or ../config.yml) and the environment.
    ///
    /// A missing file is not an error: defaults plus environment are used.
    pub fn load() -> Result<Self> {
        Self::load_dotenv();

        for candidate in [CONFIG_FILE, "../config.yml"] {
            if Path::new(candidate).exists() {
                return Self::load_from_file(candidate);
            }
        }

        let config = Self::from_yaml(YamlConfig::default());
        config.validate()?;
        Ok(config)
    }

    /// Load .env file into environment variables using dotenvy
    fn load_dotenv() {
        // Try to load from current directory first, then parent
        if dotenvy::dotenv().is_err() {
            let _ = dotenvy::from_filename("../.env");
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_yaml_str(&content)
    }

    /// Parse YAML text, apply environment overrides and validate.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let yaml: YamlConfig = if content.trim().is_empty() {
            YamlConfig::default()
        } else {
            serde_yaml::from_str(content)
                .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?
        };

        let config = Self::from_yaml(yaml);
        config.validate()?;
        Ok(config)
    }

    /// Resolve a value: prefer env var if config value looks like ${VAR}
    fn resolve_env_string(value: Option<String>, env_key: &str) -> Option<String> {
        if let Some(ref v) = value {
            if let Some(var_name) = v.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
                if let Ok(env_val) = std::env::var(var_name) {
                    return Some(env_val);
                }
            }
        }
        // Also check explicit env_key as fallback
        if let Ok(env_val) = std::env::var(env_key) {
            if !env_val.is_empty() {
                return Some(env_val);
            }
        }
        value.filter(|v| !(v.starts_with("${") && v.ends_with('}')))
    }

    /// Resolve and parse a value, ignoring anything that fails to parse
    fn resolve_env_parsed<T: FromStr>(value: Option<String>, env_key: &str) -> Option<T> {
        Self::resolve_env_string(value, env_key).and_then(|v| v.trim().parse::<T>().ok())
    }

    fn from_yaml(yaml: YamlConfig) -> Self {
        let postgres = yaml.postgres.unwrap_or_default();
        let embedding = yaml.embedding.unwrap_or_default();
        let generation = yaml.generation.unwrap_or_default();
        let retrieval = yaml.retrieval.unwrap_or_default();
        let chat = yaml.chat.unwrap_or_default();

        let store = StoreConfig {
            host: Self::resolve_env_string(postgres.host, "POSTGRES_HOST")
                .unwrap_or_else(|| "postgres".to_string()),
            port: Self::resolve_env_parsed(postgres.port, "POSTGRES_PORT").unwrap_or(5432),
            user: Self::resolve_env_string(postgres.user, "POSTGRES_USER")
                .unwrap_or_else(|| "n8n".to_string()),
            password: Self::resolve_env_string(postgres.password, "POSTGRES_PASSWORD")
                .unwrap_or_default(),
            database: Self::resolve_env_string(postgres.database, "POSTGRES_DATABASE")
                .unwrap_or_else(|| "n8n".to_string()),
        };

        let dimension = Self::resolve_env_parsed::<usize>(embedding.dimension, "OLLAMA_EMBEDDING_DIM")
            .unwrap_or(DEFAULT_EMBEDDING_DIM);

        let embedding = EmbeddingConfig {
            url: Self::resolve_env_string(embedding.url, "OLLAMA_HOST")
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            model: Self::resolve_env_string(embedding.model, "OLLAMA_EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            max_input_chars: embedding.max_input_chars.unwrap_or(DEFAULT_MAX_INPUT_CHARS),
            timeout: Duration::from_secs(
                embedding.timeout_secs.unwrap_or(DEFAULT_EMBED_TIMEOUT_SECS),
            ),
            dimension: (dimension > 0).then_some(dimension),
        };

        let generation = GenerationConfig {
            endpoint: Self::resolve_env_string(generation.endpoint, "AZURE_OPENAI_ENDPOINT")
                .unwrap_or_default()
                .trim_end_matches('/')
                .to_string(),
            api_key: Self::resolve_env_string(generation.api_key, "AZURE_OPENAI_API_KEY")
                .unwrap_or_default(),
            api_version: Self::resolve_env_string(generation.api_version, "AZURE_OPENAI_API_VERSION")
                .unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string()),
            deployment: Self::resolve_env_string(generation.deployment, "AZURE_OPENAI_DEPLOYMENT")
                .unwrap_or_else(|| DEFAULT_AZURE_DEPLOYMENT.to_string()),
            temperature: generation.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        };

        let retrieval = RetrievalConfig {
            workspace: Self::resolve_env_string(retrieval.workspace, "LIGHTRAG_WORKSPACE")
                .unwrap_or_else(|| DEFAULT_WORKSPACE.to_string()),
            entity_top_k: retrieval.entity_top_k.unwrap_or(DEFAULT_ENTITY_TOP_K),
            relation_top_k: retrieval.relation_top_k.unwrap_or(DEFAULT_RELATION_TOP_K),
            distance_threshold: retrieval
                .distance_threshold
                .unwrap_or(DEFAULT_DISTANCE_THRESHOLD),
        };

        Self {
            store,
            embedding,
            generation,
            retrieval,
            history_limit: chat.history_limit.unwrap_or(DEFAULT_HISTORY_LIMIT),
        }
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.retrieval.entity_top_k == 0 || self.retrieval.relation_top_k == 0 {
            return Err(Error::Config("top-k values must be positive".to_string()));
        }
        let threshold = self.retrieval.distance_threshold;
        if !(threshold > 0.0 && threshold <= 2.0) {
            return Err(Error::Config(format!(
                "distance_threshold must be in (0, 2], got {}",
                threshold
            )));
        }
        if self.history_limit == 0 {
            return Err(Error::Config("history_limit must be positive".to_string()));
        }
        if self.history_limit % 2 != 0 {
            return Err(Error::Config(format!(
                "history_limit must be even (user + assistant per exchange), got {}",
                self.history_limit
            )));
        }
        if self.embedding.max_input_chars == 0 {
            return Err(Error::Config("max_input_chars must be positive".to_string()));
        }
        if self.embedding.timeout.is_zero() {
            return Err(Error::Config("embedding timeout_secs must be positive".to_string()));
        }
        let temperature = self.generation.temperature;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(Error::Config(format!(
                "temperature must be in [0, 2], got {}",
                temperature
            )));
        }
        if self.retrieval.workspace.trim().is_empty() {
            return Err(Error::Config("workspace must not be empty".to_string()));
        }
        Ok(())
    }
}
