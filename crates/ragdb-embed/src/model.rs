//! In-process sentence-transformer (BERT family) embedder on candle.

use anyhow::{anyhow, Context};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use ragdb_core::error::{Error, Result};
use ragdb_core::traits::Embedder;

use crate::device::select_device;
use crate::pool::masked_mean_l2;
use crate::tokenize::tokenize_on_device;

const DEFAULT_MAX_LEN: usize = 256;

pub struct LocalModelEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    id: String,
    dim: usize,
    max_len: usize,
}

impl LocalModelEmbedder {
    /// Loads `config.json`, `tokenizer.json` and `model.safetensors`
    /// (or `pytorch_model.bin`) from `model_dir`.
    pub fn load(model_dir: &Path) -> anyhow::Result<Self> {
        let device = select_device();
        info!("loading embedding model from {}", model_dir.display());

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;

        let config_path = model_dir.join("config.json");
        let raw_config = std::fs::read_to_string(&config_path)
            .with_context(|| format!("reading {}", config_path.display()))?;
        let config: BertConfig = serde_json::from_str(&raw_config)?;
        let shape: serde_json::Value = serde_json::from_str(&raw_config)?;
        let dim = shape
            .get("hidden_size")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| anyhow!("{} has no hidden_size", config_path.display()))? as usize;
        let max_len = shape
            .get("max_position_embeddings")
            .and_then(serde_json::Value::as_u64)
            .map_or(DEFAULT_MAX_LEN, |n| (n as usize).min(512));

        let weights = load_weights(model_dir, &device)?;
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let model = BertModel::load(vb, &config)?;

        let name = model_dir.file_name().map_or_else(|| "model".to_string(), |n| n.to_string_lossy().to_string());
        let id = format!("local:{name}:d{dim}");
        info!(embedder_id = %id, "embedding model loaded");
        Ok(Self { model, tokenizer, device, id, dim, max_len })
    }

    fn embed_one(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize_on_device(&self.tokenizer, text, self.max_len, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let v: Vec<f32> = pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1()?;
        if start.elapsed().as_millis() > 100 {
            debug!(ms = start.elapsed().as_millis() as u64, "slow embedding");
        }
        Ok(v)
    }
}

impl Embedder for LocalModelEmbedder {
    fn embedder_id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> Option<usize> {
        Some(self.dim)
    }

    /// One forward pass per text: padded batches shift pooled values slightly.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts
            .iter()
            .map(|t| self.embed_one(t).map_err(Error::Provider))
            .collect()
    }
}

fn load_weights(model_dir: &Path, device: &Device) -> anyhow::Result<HashMap<String, Tensor>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        return Ok(candle_core::safetensors::load(&safetensors, device)?);
    }
    let pickle = model_dir.join("pytorch_model.bin");
    if pickle.exists() {
        let weights = candle_core::pickle::read_all(&pickle)?;
        let mut map = HashMap::with_capacity(weights.len());
        for (name, tensor) in weights {
            map.insert(name, tensor.to_device(device)?);
        }
        return Ok(map);
    }
    Err(anyhow!("no model.safetensors or pytorch_model.bin in {}", model_dir.display()))
}

/// Finds the model directory: explicit config, `APP_MODEL_DIR`, `MODEL_DIR`,
/// then the conventional `models/all-MiniLM-L6-v2` locations.
pub fn resolve_model_dir(configured: Option<&str>) -> anyhow::Result<PathBuf> {
    if let Some(dir) = configured {
        let p = ragdb_core::config::expand_path(dir);
        if p.exists() { return Ok(p); }
        warn!("configured model_dir {} does not exist", p.display());
    }
    for var in ["APP_MODEL_DIR", "MODEL_DIR"] {
        if let Ok(dir) = std::env::var(var) {
            let p = PathBuf::from(&dir);
            if p.exists() { debug!("using {var}: {}", p.display()); return Ok(p); }
        }
    }
    for candidate in ["models/all-MiniLM-L6-v2", "../models/all-MiniLM-L6-v2"] {
        let p = Path::new(candidate);
        if p.exists() { return Ok(p.to_path_buf()); }
    }
    Err(anyhow!("Could not locate a sentence-transformer model directory"))
}
