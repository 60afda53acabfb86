use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use thiserror::Error;

const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_INDEX_PATH: &str = "vector_index/index.json";

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the pdfchat server.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Provider serving both embeddings and completions.
    pub model_provider: ModelProvider,
    /// Credential for the hosted provider. Required when `model_provider` is Gemini.
    pub google_api_key: Option<String>,
    /// Base URL of the Gemini REST API.
    pub gemini_api_base: String,
    /// Base URL of the local Ollama runtime.
    pub ollama_url: String,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Completion model identifier passed to the provider.
    pub completion_model: String,
    /// Sampling temperature used for answers.
    pub completion_temperature: f32,
    /// Maximum characters per chunk.
    pub text_splitter_chunk_size: usize,
    /// Characters shared between consecutive chunks.
    pub text_splitter_chunk_overlap: usize,
    /// Number of chunks retrieved per question.
    pub retrieval_top_k: usize,
    /// Upper bound on the rendered prompt length, in characters.
    pub max_prompt_chars: usize,
    /// Location of the persisted vector index.
    pub index_path: PathBuf,
    /// What to do when one uploaded document cannot be parsed.
    pub extraction_failure_policy: ExtractionFailurePolicy,
    /// Timeout applied to every outbound model request, in seconds.
    pub model_request_timeout_secs: u64,
    /// Request body limit for uploads, in bytes.
    pub max_upload_bytes: usize,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Supported model backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    /// Hosted Google Gemini API.
    Gemini,
    /// Local Ollama runtime.
    Ollama,
}

/// Batch behaviour when a document in an upload fails to parse.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionFailurePolicy {
    /// Fail the whole upload on the first unparsable document.
    #[default]
    Abort,
    /// Log and skip unparsable documents, indexing the rest.
    Skip,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let model_provider = match load_env_optional("MODEL_PROVIDER") {
            Some(value) => value
                .parse()
                .map_err(|()| ConfigError::InvalidValue("MODEL_PROVIDER".into()))?,
            None => ModelProvider::Gemini,
        };

        let google_api_key = load_env_optional("GOOGLE_API_KEY");
        if model_provider == ModelProvider::Gemini && google_api_key.is_none() {
            return Err(ConfigError::MissingVariable("GOOGLE_API_KEY".into()));
        }

        let (default_embedding, default_completion) = match model_provider {
            ModelProvider::Gemini => ("embedding-001", "gemini-1.5-flash"),
            ModelProvider::Ollama => ("nomic-embed-text", "llama3.1"),
        };

        let config = Self {
            model_provider,
            google_api_key,
            gemini_api_base: load_env_optional("GEMINI_API_BASE")
                .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string()),
            ollama_url: load_env_optional("OLLAMA_URL")
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            embedding_model: load_env_optional("EMBEDDING_MODEL")
                .unwrap_or_else(|| default_embedding.to_string()),
            completion_model: load_env_optional("COMPLETION_MODEL")
                .unwrap_or_else(|| default_completion.to_string()),
            completion_temperature: parse_optional("COMPLETION_TEMPERATURE")?.unwrap_or(0.3),
            text_splitter_chunk_size: parse_optional("TEXT_SPLITTER_CHUNK_SIZE")?
                .unwrap_or(10_000),
            text_splitter_chunk_overlap: parse_optional("TEXT_SPLITTER_CHUNK_OVERLAP")?
                .unwrap_or(1_000),
            retrieval_top_k: parse_optional("RETRIEVAL_TOP_K")?.unwrap_or(4),
            max_prompt_chars: parse_optional("MAX_PROMPT_CHARS")?.unwrap_or(120_000),
            index_path: load_env_optional("INDEX_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_INDEX_PATH)),
            extraction_failure_policy: match load_env_optional("EXTRACTION_FAILURE_POLICY") {
                Some(value) => value.parse().map_err(|()| {
                    ConfigError::InvalidValue("EXTRACTION_FAILURE_POLICY".into())
                })?,
                None => ExtractionFailurePolicy::default(),
            },
            model_request_timeout_secs: parse_optional("MODEL_REQUEST_TIMEOUT_SECS")?
                .unwrap_or(60),
            max_upload_bytes: parse_optional("MAX_UPLOAD_BYTES")?.unwrap_or(50 * 1024 * 1024),
            server_port: parse_optional("SERVER_PORT")?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject combinations that would make the pipeline unusable at request time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.text_splitter_chunk_size == 0 {
            return Err(ConfigError::InvalidValue("TEXT_SPLITTER_CHUNK_SIZE".into()));
        }
        if self.text_splitter_chunk_overlap >= self.text_splitter_chunk_size {
            return Err(ConfigError::InvalidValue(
                "TEXT_SPLITTER_CHUNK_OVERLAP (must be smaller than the chunk size)".into(),
            ));
        }
        if self.retrieval_top_k == 0 {
            return Err(ConfigError::InvalidValue("RETRIEVAL_TOP_K".into()));
        }
        if !(0.0..=1.0).contains(&self.completion_temperature) {
            return Err(ConfigError::InvalidValue("COMPLETION_TEMPERATURE".into()));
        }
        if self.model_request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue("MODEL_REQUEST_TIMEOUT_SECS".into()));
        }
        Ok(())
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_optional<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

impl std::str::FromStr for ModelProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            _ => Err(()),
        }
    }
}

impl std::str::FromStr for ExtractionFailurePolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "abort" => Ok(Self::Abort),
            "skip" => Ok(Self::Skip),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Command-line overrides applied on top of the environment.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    /// Port to listen on instead of `SERVER_PORT`.
    pub server_port: Option<u16>,
    /// Index location instead of `INDEX_PATH`.
    pub index_path: Option<PathBuf>,
}

/// Load configuration from the environment, apply overrides, and install it in the global cache.
///
/// Fails when a required credential is absent so the process never starts half-configured.
pub fn init_config(overrides: ConfigOverrides) -> Result<&'static Config, ConfigError> {
    dotenvy::dotenv().ok();
    let mut config = Config::from_env()?;
    if let Some(port) = overrides.server_port {
        config.server_port = Some(port);
    }
    if let Some(path) = overrides.index_path {
        config.index_path = path;
    }
    tracing::debug!(
        provider = ?config.model_provider,
        embedding_model = %config.embedding_model,
        completion_model = %config.completion_model,
        index_path = %config.index_path.display(),
        chunk_size = config.text_splitter_chunk_size,
        chunk_overlap = config.text_splitter_chunk_overlap,
        top_k = config.retrieval_top_k,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    Ok(CONFIG.get_or_init(|| config))
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        model_provider: ModelProvider::Ollama,
        google_api_key: None,
        gemini_api_base: DEFAULT_GEMINI_API_BASE.into(),
        ollama_url: DEFAULT_OLLAMA_URL.into(),
        embedding_model: "nomic-embed-text".into(),
        completion_model: "llama3.1".into(),
        completion_temperature: 0.3,
        text_splitter_chunk_size: 10_000,
        text_splitter_chunk_overlap: 1_000,
        retrieval_top_k: 4,
        max_prompt_chars: 120_000,
        index_path: PathBuf::from(DEFAULT_INDEX_PATH),
        extraction_failure_policy: ExtractionFailurePolicy::Abort,
        model_request_timeout_secs: 60,
        max_upload_bytes: 1024 * 1024,
        server_port: None,
    }
}
