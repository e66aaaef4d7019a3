//! Configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (`__` separates nested keys, e.g. `APP_RETRIEVAL__K=5`). The engine itself
//! only consumes validated [`RetrievalParams`]; loading lives here for binaries.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::chunker::{ChunkerKind, ChunkingConfig};
use crate::error::{Error, Result};
use crate::metric::Metric;
use crate::normalize::FailurePolicy;

/// Keys in the record store that hold configuration, never records.
pub const RESERVED_KEYS: [&str; 2] = ["agent_config", "rag_config"];

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(RagConfig::default()))
            .merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.rag()?.validate()?;
        Ok(config)
    }

    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    pub fn rag(&self) -> anyhow::Result<RagConfig> {
        self.figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to read configuration: {}", e))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub retrieval: RetrievalParams,
    pub index: IndexConfig,
    pub embedder: EmbedderConfig,
    pub source: SourceConfig,
    pub build: BuildConfig,
}

impl RagConfig {
    pub fn validate(&self) -> Result<()> {
        self.retrieval.validate()?;
        self.build.validate()
    }
}

/// Parameters the engine validates before doing any I/O.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalParams {
    pub k: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub chunker: ChunkerKind,
    /// Per-query embedding deadline; 0 disables it.
    pub query_timeout_ms: u64,
    /// Conversation turns kept by the serving layer; reported, not interpreted.
    pub memory: usize,
}

impl Default for RetrievalParams {
    fn default() -> Self {
        Self {
            k: 10,
            chunk_size: 1000,
            chunk_overlap: 50,
            chunker: ChunkerKind::Fixed,
            query_timeout_ms: 10_000,
            memory: 4,
        }
    }
}

impl RetrievalParams {
    pub fn validate(&self) -> Result<()> {
        validate_k(self.k)?;
        self.chunking().validate()
    }

    pub fn chunking(&self) -> ChunkingConfig {
        ChunkingConfig { chunk_size: self.chunk_size, overlap: self.chunk_overlap }
    }

    pub fn query_timeout(&self) -> Option<std::time::Duration> {
        (self.query_timeout_ms > 0).then(|| std::time::Duration::from_millis(self.query_timeout_ms))
    }
}

pub fn validate_k(k: usize) -> Result<()> {
    if k == 0 {
        return Err(Error::InvalidConfig("k must be a positive integer".into()));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    #[default]
    Flat,
    Ivf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub kind: IndexKind,
    pub metric: Metric,
    /// IVF list count; derived from corpus size when absent.
    pub nlist: Option<usize>,
    pub nprobe: usize,
    pub snapshot_path: Option<String>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self { kind: IndexKind::Flat, metric: Metric::SquaredL2, nlist: None, nprobe: 8, snapshot_path: None }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderKind {
    /// Deterministic feature hashing; no model files needed.
    #[default]
    Hash,
    /// Sentence-transformer weights run in process.
    Local,
    /// Averaged word vectors from a GloVe text file.
    Glove,
    /// OpenAI-compatible `/embeddings` endpoint.
    Remote,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedderConfig {
    pub kind: EmbedderKind,
    /// Hash embedder width, or the expected remote dimension when known.
    pub dimension: Option<usize>,
    pub model_dir: Option<String>,
    pub vectors_path: Option<String>,
    pub endpoint: String,
    pub model: String,
    pub api_key_env: String,
    pub timeout_ms: u64,
    pub batch_size: usize,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            kind: EmbedderKind::Hash,
            dimension: None,
            model_dir: None,
            vectors_path: None,
            endpoint: "https://api.deepinfra.com/v1/openai".to_string(),
            model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            api_key_env: "DEEPINFRA_TOKEN".to_string(),
            timeout_ms: 30_000,
            batch_size: 32,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Upstash,
    #[default]
    Dir,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub url: String,
    pub url_env: String,
    pub token_env: String,
    pub data_dir: String,
    /// Extra keys to ignore on top of [`RESERVED_KEYS`].
    pub excluded_keys: Vec<String>,
    pub concurrency: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Dir,
            url: String::new(),
            url_env: "UPSTASH_REDIS_REST_URL".to_string(),
            token_env: "UPSTASH_REDIS_REST_TOKEN".to_string(),
            data_dir: "data".to_string(),
            excluded_keys: Vec::new(),
            concurrency: 4,
        }
    }
}

impl SourceConfig {
    pub fn excluded(&self) -> Vec<String> {
        let mut keys: Vec<String> = RESERVED_KEYS.iter().map(|k| (*k).to_string()).collect();
        for k in &self.excluded_keys {
            if !keys.contains(k) {
                keys.push(k.clone());
            }
        }
        keys
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub batch_size: usize,
    pub embed_concurrency: usize,
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub show_progress: bool,
    pub failure_policy: FailurePolicy,
    /// Embedding cache file kept across restarts; in-memory only when absent.
    pub cache_path: Option<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            batch_size: 64,
            embed_concurrency: 4,
            max_attempts: 3,
            initial_backoff_ms: 500,
            show_progress: false,
            failure_policy: FailurePolicy::Skip,
            cache_path: None,
        }
    }
}

impl BuildConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 || self.embed_concurrency == 0 {
            return Err(Error::InvalidConfig("build.batch_size and build.embed_concurrency must be positive".into()));
        }
        if self.max_attempts == 0 {
            return Err(Error::InvalidConfig("build.max_attempts must be at least 1".into()));
        }
        Ok(())
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
