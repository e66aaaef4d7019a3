//! OpenAI-compatible `/embeddings` client (DeepInfra, OpenAI, local servers).
//!
//! Uses the blocking reqwest client; callers on an async runtime go through
//! `spawn_blocking`, which is what the build pipeline and retriever do.

use anyhow::{anyhow, bail, Context};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::debug;

use ragdb_core::config::EmbedderConfig;
use ragdb_core::error::{Error, Result};
use ragdb_core::traits::Embedder;

/// Sent once to learn the dimension when only empty texts have been seen.
const DIMENSION_SAMPLE: &str = "dimension";

#[derive(Debug, Clone)]
pub struct RemoteSettings {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub batch_size: usize,
    pub dimension: Option<usize>,
}

impl RemoteSettings {
    pub fn from_config(config: &EmbedderConfig) -> Self {
        let api_key = std::env::var(&config.api_key_env).ok().filter(|k| !k.is_empty());
        if api_key.is_none() {
            debug!("{} not set; sending requests without a bearer token", config.api_key_env);
        }
        Self {
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
            timeout: Duration::from_millis(config.timeout_ms),
            batch_size: config.batch_size.max(1),
            dimension: config.dimension,
        }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    encoding_format: &'static str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    index: usize,
    embedding: Vec<f32>,
}

pub struct RemoteEmbedder {
    settings: RemoteSettings,
    id: String,
    client: OnceLock<reqwest::blocking::Client>,
    observed_dim: OnceLock<usize>,
}

impl RemoteEmbedder {
    pub fn new(settings: RemoteSettings) -> Self {
        let id = format!("remote:{}", settings.model);
        let observed_dim = OnceLock::new();
        if let Some(d) = settings.dimension {
            let _ = observed_dim.set(d);
        }
        Self { settings, id, client: OnceLock::new(), observed_dim }
    }

    fn url(&self) -> String {
        format!("{}/embeddings", self.settings.endpoint.trim_end_matches('/'))
    }

    fn client(&self) -> anyhow::Result<&reqwest::blocking::Client> {
        if let Some(c) = self.client.get() {
            return Ok(c);
        }
        let built = reqwest::blocking::Client::builder()
            .timeout(self.settings.timeout)
            .build()
            .context("building HTTP client")?;
        Ok(self.client.get_or_init(|| built))
    }

    fn request(&self, inputs: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        let body = EmbeddingRequest { model: &self.settings.model, input: inputs, encoding_format: "float" };
        let mut req = self.client()?.post(self.url()).json(&body);
        if let Some(key) = &self.settings.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req.send().with_context(|| format!("POST {}", self.url()))?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().unwrap_or_default();
            bail!("embedding endpoint returned {status}: {}", text.chars().take(200).collect::<String>());
        }
        let parsed: EmbeddingResponse = resp.json().context("decoding embedding response")?;
        order_response(parsed, inputs.len())
    }

    fn learn_dim(&self) -> Result<usize> {
        let vectors = self.request(&[DIMENSION_SAMPLE.to_string()]).map_err(Error::Provider)?;
        let dim = vectors
            .first()
            .map(Vec::len)
            .filter(|&d| d > 0)
            .ok_or_else(|| Error::Provider(anyhow!("embedding endpoint returned an empty vector")))?;
        debug!(dim, "learned remote embedding dimension");
        Ok(*self.observed_dim.get_or_init(|| dim))
    }
}

fn order_response(mut parsed: EmbeddingResponse, expected: usize) -> anyhow::Result<Vec<Vec<f32>>> {
    if parsed.data.len() != expected {
        bail!("asked for {expected} embeddings, received {}", parsed.data.len());
    }
    parsed.data.sort_by_key(|d| d.index);
    if parsed.data.iter().enumerate().any(|(i, d)| d.index != i) {
        return Err(anyhow!("embedding response indices are not 0..{expected}"));
    }
    Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
}

impl Embedder for RemoteEmbedder {
    fn embedder_id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> Option<usize> {
        self.observed_dim.get().copied()
    }

    /// Empty strings never reach the provider; many reject empty input.
    /// They are answered with a zero vector of the provider's dimension,
    /// learned from this batch, an earlier call, configuration, or one
    /// extra request for a sample text.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
        let pending: Vec<usize> = (0..texts.len()).filter(|&i| !texts[i].is_empty()).collect();
        for batch in pending.chunks(self.settings.batch_size) {
            let inputs: Vec<String> = batch.iter().map(|&i| texts[i].clone()).collect();
            let vectors = self.request(&inputs).map_err(Error::Provider)?;
            for (&i, v) in batch.iter().zip(vectors) {
                let _ = self.observed_dim.set(v.len());
                out[i] = Some(v);
            }
        }
        if out.iter().all(Option::is_some) {
            return Ok(out.into_iter().flatten().collect());
        }
        let dim = match self.dim() {
            Some(d) => d,
            None => self.learn_dim()?,
        };
        Ok(out.into_iter().map(|v| v.unwrap_or_else(|| vec![0.0; dim])).collect())
    }
}
