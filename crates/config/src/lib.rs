//! Configuration loading, validation, and management for the mascot service.
//!
//! Precedence, lowest to highest: built-in defaults, an optional TOML file
//! (`--config`, `MASCOT_CONFIG`, or `./mascot.toml`), then environment
//! variables. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "mascot.toml";

/// The root configuration structure.
///
/// Maps directly to `mascot.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Tracing filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Admission and token ceilings
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Vector store selection and settings
    #[serde(default)]
    pub vector: VectorConfig,

    /// Completion (generation) service
    #[serde(default)]
    pub llm: LlmConfig,

    /// Embedding service
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Persona registry, keyed by persona id
    #[serde(default)]
    pub personas: BTreeMap<String, PersonaConfig>,
}

fn default_log_level() -> String {
    "info".into()
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Overall per-request deadline; stage timeouts are carved from it
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// How often stale rate-limit buckets are swept
    #[serde(default = "default_sweep_interval_secs")]
    pub rate_limit_sweep_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8000
}
fn default_request_timeout_secs() -> u64 {
    60
}
fn default_sweep_interval_secs() -> u64 {
    60
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout_secs(),
            rate_limit_sweep_secs: default_sweep_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: u32,

    #[serde(default = "default_max_input_tokens")]
    pub max_input_tokens: usize,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

fn default_rate_limit() -> u32 {
    10
}
fn default_max_input_tokens() -> usize {
    4096
}
fn default_max_output_tokens() -> u32 {
    1024
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            rate_limit_per_minute: default_rate_limit(),
            max_input_tokens: default_max_input_tokens(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

/// Which vector-store backend is active. Decided once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorBackend {
    /// SQLite file under `persist_dir`
    Local,
    /// The same chunks served by a Chroma server at `chroma_host`
    Remote,
    /// Managed approximate-nearest-neighbour endpoint
    Managed,
}

/// How the managed backend reports neighbour distance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMeasure {
    /// Higher is more similar
    #[default]
    DotProduct,
    /// Lower is more similar, in [0, 2]
    Cosine,
    /// Lower is more similar, unbounded
    SquaredL2,
}

impl std::str::FromStr for DistanceMeasure {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dot_product" | "dot_product_distance" => Ok(Self::DotProduct),
            "cosine" | "cosine_distance" => Ok(Self::Cosine),
            "squared_l2" | "squared_l2_distance" => Ok(Self::SquaredL2),
            other => Err(format!("unknown distance measure '{other}'")),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct VectorConfig {
    /// Collection name; the local backend stores `<collection>.sqlite3`
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Directory holding the local backend's database file
    #[serde(default = "default_persist_dir")]
    pub persist_dir: PathBuf,

    /// Chroma server host; when set, replaces the local file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chroma_host: Option<String>,

    #[serde(default = "default_chroma_port")]
    pub chroma_port: u16,

    /// Public endpoint domain of the managed index (e.g. `https://123.us-east1-456.vdb.vertexai.goog`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,

    /// Managed index endpoint id; its presence selects the managed backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_id: Option<String>,

    #[serde(default = "default_deployed_index_id")]
    pub deployed_index_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gcp_project_id: Option<String>,

    #[serde(default = "default_gcp_region")]
    pub gcp_region: String,

    /// OAuth bearer token for the managed endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    #[serde(default)]
    pub distance_measure: DistanceMeasure,

    /// Timeout for a single vector query
    #[serde(default = "default_vector_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_collection() -> String {
    "uplifted_mascot".into()
}
fn default_persist_dir() -> PathBuf {
    PathBuf::from("./vector_db")
}
fn default_chroma_port() -> u16 {
    8000
}
fn default_deployed_index_id() -> String {
    "um_deployed_index".into()
}
fn default_gcp_region() -> String {
    "us-east1".into()
}
fn default_vector_timeout_secs() -> u64 {
    10
}

impl VectorConfig {
    /// The backend selected by this configuration.
    pub fn backend(&self) -> VectorBackend {
        if self.endpoint_id.is_some() {
            VectorBackend::Managed
        } else if self.chroma_host.is_some() {
            VectorBackend::Remote
        } else {
            VectorBackend::Local
        }
    }

    /// Base URL of the Chroma server, if one is configured.
    pub fn chroma_base_url(&self) -> Option<String> {
        let host = self.chroma_host.as_deref()?.trim_end_matches('/');
        Some(if host.contains("://") {
            format!("{host}:{}", self.chroma_port)
        } else {
            format!("http://{host}:{}", self.chroma_port)
        })
    }

    /// Path of the local backend's database file.
    pub fn local_db_path(&self) -> PathBuf {
        self.persist_dir.join(format!("{}.sqlite3", self.collection))
    }
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            collection: default_collection(),
            persist_dir: default_persist_dir(),
            chroma_host: None,
            chroma_port: default_chroma_port(),
            endpoint_url: None,
            endpoint_id: None,
            deployed_index_id: default_deployed_index_id(),
            gcp_project_id: None,
            gcp_region: default_gcp_region(),
            api_token: None,
            distance_measure: DistanceMeasure::default(),
            timeout_secs: default_vector_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for VectorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorConfig")
            .field("collection", &self.collection)
            .field("persist_dir", &self.persist_dir)
            .field("chroma_host", &self.chroma_host)
            .field("chroma_port", &self.chroma_port)
            .field("endpoint_url", &self.endpoint_url)
            .field("endpoint_id", &self.endpoint_id)
            .field("deployed_index_id", &self.deployed_index_id)
            .field("gcp_project_id", &self.gcp_project_id)
            .field("gcp_region", &self.gcp_region)
            .field("api_token", &redact(&self.api_token))
            .field("distance_measure", &self.distance_measure)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// OpenAI-compatible base URL (ending in `/v1` or equivalent)
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Fixed generation timeout; never retried
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_generation_timeout_secs() -> u64 {
    30
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: None,
            model: default_model(),
            temperature: default_temperature(),
            timeout_secs: default_generation_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Falls back to `llm.api_url` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Falls back to `llm.api_key` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries after the first attempt, transient failures only
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// First backoff delay; doubles per retry
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}
fn default_embedding_timeout_secs() -> u64 {
    10
}
fn default_max_retries() -> u32 {
    2
}
fn default_backoff_base_ms() -> u64 {
    200
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            api_key: None,
            model: default_embedding_model(),
            timeout_secs: default_embedding_timeout_secs(),
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base_ms(),
        }
    }
}

impl std::fmt::Debug for EmbeddingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("backoff_base_ms", &self.backoff_base_ms)
            .finish()
    }
}

/// A persona definition in `[personas.<id>]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    pub system_prompt: String,
}

impl AppConfig {
    /// Load configuration from `path`, `MASCOT_CONFIG`, or `./mascot.toml`,
    /// then apply environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("MASCOT_CONFIG").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        Self::load_with(&path, |key| std::env::var(key).ok())
    }

    /// Layer defaults, the file at `path`, then `lookup` overrides, and
    /// validate the merged result once.
    pub fn load_with<F>(path: &Path, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::load_from(path)?;
        config.apply_env(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a specific file path, without env overrides or validation.
    ///
    /// The file alone may be incomplete; call [`AppConfig::validate`] once
    /// every layer has been applied.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Apply environment-variable overrides through `lookup`.
    ///
    /// Takes a lookup function so tests never touch the process environment.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("LOG_LEVEL") {
            self.log_level = v.to_lowercase();
        }
        if let Some(v) = get("HOST") {
            self.server.host = v;
        }
        if let Some(v) = get("PORT") {
            self.server.port = parse_env("PORT", &v)?;
        }
        if let Some(v) = get("REQUEST_TIMEOUT_SECS") {
            self.server.request_timeout_secs = parse_env("REQUEST_TIMEOUT_SECS", &v)?;
        }

        if let Some(v) = get("RATE_LIMIT_PER_MINUTE") {
            self.limits.rate_limit_per_minute = parse_env("RATE_LIMIT_PER_MINUTE", &v)?;
        }
        if let Some(v) = get("MAX_INPUT_TOKENS") {
            self.limits.max_input_tokens = parse_env("MAX_INPUT_TOKENS", &v)?;
        }
        if let Some(v) = get("MAX_OUTPUT_TOKENS") {
            self.limits.max_output_tokens = parse_env("MAX_OUTPUT_TOKENS", &v)?;
        }

        if let Some(v) = get("VECTOR_COLLECTION_NAME") {
            self.vector.collection = v;
        }
        if let Some(v) = get("VECTOR_PERSIST_DIR") {
            self.vector.persist_dir = PathBuf::from(v);
        }
        if let Some(v) = get("CHROMA_HOST") {
            self.vector.chroma_host = Some(v);
        }
        if let Some(v) = get("CHROMA_PORT") {
            self.vector.chroma_port = parse_env("CHROMA_PORT", &v)?;
        }
        if let Some(v) = get("VECTOR_ENDPOINT_URL") {
            self.vector.endpoint_url = Some(v);
        }
        if let Some(v) = get("VECTOR_ENDPOINT_ID") {
            self.vector.endpoint_id = Some(v);
        }
        if let Some(v) = get("DEPLOYED_INDEX_ID") {
            self.vector.deployed_index_id = v;
        }
        if let Some(v) = get("GCP_PROJECT_ID") {
            self.vector.gcp_project_id = Some(v);
        }
        if let Some(v) = get("GCP_REGION") {
            self.vector.gcp_region = v;
        }
        if let Some(v) = get("VECTOR_API_TOKEN") {
            self.vector.api_token = Some(v);
        }
        if let Some(v) = get("VECTOR_DISTANCE_MEASURE") {
            self.vector.distance_measure =
                v.parse().map_err(|reason| ConfigError::InvalidEnv {
                    var: "VECTOR_DISTANCE_MEASURE".into(),
                    reason,
                })?;
        }

        if let Some(v) = get("LLM_API_URL") {
            self.llm.api_url = v;
        }
        if let Some(v) = get("LLM_API_KEY") {
            self.llm.api_key = Some(v);
        }
        if let Some(v) = get("LLM_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = get("LLM_TEMPERATURE") {
            self.llm.temperature = parse_env("LLM_TEMPERATURE", &v)?;
        }

        if let Some(v) = get("EMBEDDING_API_URL") {
            self.embedding.api_url = Some(v);
        }
        if let Some(v) = get("EMBEDDING_API_KEY") {
            self.embedding.api_key = Some(v);
        }
        if let Some(v) = get("EMBEDDING_MODEL") {
            self.embedding.model = v;
        }

        Ok(())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_input_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "max_input_tokens must be > 0".into(),
            ));
        }

        if self.limits.max_output_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "max_output_tokens must be > 0".into(),
            ));
        }

        if self.llm.temperature < 0.0 || self.llm.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "llm.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.server.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "request_timeout_secs must be > 0".into(),
            ));
        }

        if self.vector.collection.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "vector.collection must not be empty".into(),
            ));
        }

        if self.vector.backend() == VectorBackend::Managed {
            if self.vector.endpoint_url.is_none() {
                return Err(ConfigError::ValidationError(
                    "VECTOR_ENDPOINT_URL is required when VECTOR_ENDPOINT_ID is set".into(),
                ));
            }
            if self.vector.gcp_project_id.is_none() {
                return Err(ConfigError::ValidationError(
                    "GCP_PROJECT_ID is required when VECTOR_ENDPOINT_ID is set".into(),
                ));
            }
        }

        if let Some((id, _)) = self
            .personas
            .iter()
            .find(|(_, p)| p.system_prompt.trim().is_empty())
        {
            return Err(ConfigError::ValidationError(format!(
                "persona '{id}' has an empty system_prompt"
            )));
        }

        Ok(())
    }

    /// Embedding endpoint, falling back to the completion endpoint.
    pub fn embedding_api_url(&self) -> &str {
        self.embedding.api_url.as_deref().unwrap_or(&self.llm.api_url)
    }

    /// Embedding key, falling back to the completion key.
    pub fn embedding_api_key(&self) -> Option<&str> {
        self.embedding
            .api_key
            .as_deref()
            .or(self.llm.api_key.as_deref())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            server: ServerConfig::default(),
            limits: LimitsConfig::default(),
            vector: VectorConfig::default(),
            llm: LlmConfig::default(),
            embedding: EmbeddingConfig::default(),
            personas: BTreeMap::new(),
        }
    }
}

fn parse_env<T: std::str::FromStr>(var: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidEnv {
            var: var.into(),
            reason: format!("'{value}': {e}"),
        })
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Invalid value for {var}: {reason}")]
    InvalidEnv { var: String, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.limits.rate_limit_per_minute, 10);
        assert_eq!(config.limits.max_input_tokens, 4096);
        assert_eq!(config.limits.max_output_tokens, 1024);
        assert_eq!(config.vector.backend(), VectorBackend::Local);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.server.port, config.server.port);
        assert_eq!(parsed.vector.collection, config.vector.collection);
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/mascot.toml")).unwrap();
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn env_overrides_limits() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[
                ("RATE_LIMIT_PER_MINUTE", "3"),
                ("MAX_INPUT_TOKENS", "600"),
                ("MAX_OUTPUT_TOKENS", "256"),
            ]))
            .unwrap();
        assert_eq!(config.limits.rate_limit_per_minute, 3);
        assert_eq!(config.limits.max_input_tokens, 600);
        assert_eq!(config.limits.max_output_tokens, 256);
    }

    #[test]
    fn invalid_env_number_is_reported() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env(env(&[("RATE_LIMIT_PER_MINUTE", "ten")]))
            .unwrap_err();
        assert!(err.to_string().contains("RATE_LIMIT_PER_MINUTE"));
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[("LLM_MODEL", "  ")])).unwrap();
        assert_eq!(config.llm.model, "gpt-4o-mini");
    }

    #[test]
    fn managed_backend_selected_by_endpoint_id() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[
                ("VECTOR_ENDPOINT_ID", "987"),
                ("VECTOR_ENDPOINT_URL", "https://1.us-east1-2.vdb.vertexai.goog"),
                ("GCP_PROJECT_ID", "my-proj"),
                ("VECTOR_DISTANCE_MEASURE", "COSINE_DISTANCE"),
            ]))
            .unwrap();
        assert_eq!(config.vector.backend(), VectorBackend::Managed);
        assert_eq!(config.vector.distance_measure, DistanceMeasure::Cosine);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn chroma_host_selects_remote_backend() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[("CHROMA_HOST", "chroma.svc"), ("CHROMA_PORT", "8001")]))
            .unwrap();
        assert_eq!(config.vector.backend(), VectorBackend::Remote);
        assert_eq!(
            config.vector.chroma_base_url().as_deref(),
            Some("http://chroma.svc:8001")
        );

        config.vector.endpoint_id = Some("42".into());
        assert_eq!(config.vector.backend(), VectorBackend::Managed);
    }

    #[test]
    fn chroma_host_keeps_explicit_scheme() {
        let vector = VectorConfig {
            chroma_host: Some("https://chroma.example.com/".into()),
            ..VectorConfig::default()
        };
        assert_eq!(
            vector.chroma_base_url().as_deref(),
            Some("https://chroma.example.com:8000")
        );
        assert!(VectorConfig::default().chroma_base_url().is_none());
    }

    #[test]
    fn managed_backend_requires_endpoint_url() {
        let mut config = AppConfig::default();
        config.vector.endpoint_id = Some("987".into());
        config.vector.gcp_project_id = Some("p".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn embedding_falls_back_to_llm_endpoint() {
        let mut config = AppConfig::default();
        config.llm.api_key = Some("sk-llm".into());
        assert_eq!(config.embedding_api_url(), "https://api.openai.com/v1");
        assert_eq!(config.embedding_api_key(), Some("sk-llm"));

        config.embedding.api_key = Some("sk-embed".into());
        assert_eq!(config.embedding_api_key(), Some("sk-embed"));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let mut config = AppConfig::default();
        config.llm.api_key = Some("sk-secret".into());
        config.vector.api_token = Some("ya29.token".into());
        let dbg = format!("{config:?}");
        assert!(!dbg.contains("sk-secret"));
        assert!(!dbg.contains("ya29.token"));
        assert!(dbg.contains("[REDACTED]"));
    }

    #[test]
    fn personas_parse_from_toml() {
        let toml_str = r#"
[personas.gooey]
system_prompt = "You are Gooey."

[personas.bill]
system_prompt = "You are Bill."
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.personas.len(), 2);
        assert_eq!(config.personas["gooey"].system_prompt, "You are Gooey.");
    }

    #[test]
    fn empty_persona_prompt_rejected() {
        let mut config = AppConfig::default();
        config.personas.insert(
            "blank".into(),
            PersonaConfig {
                system_prompt: "   ".into(),
            },
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn local_db_path_uses_collection() {
        let config = AppConfig::default();
        assert_eq!(
            config.vector.local_db_path(),
            PathBuf::from("./vector_db/uplifted_mascot.sqlite3")
        );
    }

    fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mascot.toml");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn env_completes_partial_managed_file() {
        let (_dir, path) = write_config(
            r#"
            [vector]
            endpoint_id = "42"
            gcp_project_id = "p"
            "#,
        );
        let config = AppConfig::load_with(
            &path,
            env(&[("VECTOR_ENDPOINT_URL", "https://1.us-east1-2.vdb.vertexai.goog")]),
        )
        .unwrap();
        assert_eq!(config.vector.backend(), VectorBackend::Managed);
        assert_eq!(config.vector.endpoint_id.as_deref(), Some("42"));
    }

    #[test]
    fn env_corrects_invalid_file_value() {
        let (_dir, path) = write_config("[limits]\nmax_input_tokens = 0\n");
        assert!(AppConfig::load_with(&path, env(&[])).is_err());

        let config = AppConfig::load_with(&path, env(&[("MAX_INPUT_TOKENS", "800")])).unwrap();
        assert_eq!(config.limits.max_input_tokens, 800);
    }

    #[test]
    fn load_from_does_not_validate() {
        let (_dir, path) = write_config("[limits]\nmax_input_tokens = 0\n");
        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.limits.max_input_tokens, 0);
    }
}
