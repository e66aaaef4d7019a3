use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

use ragdb_core::error::{Error, Result};
use ragdb_core::traits::Embedder;

const WORD_WEIGHT: f32 = 1.0;
const TRIGRAM_WEIGHT: f32 = 0.5;

/// Deterministic feature-hashing embedder.
///
/// Lowercased word tokens and their character trigrams are hashed into `dim`
/// buckets and the result is L2-normalized. Needs no model files, so it backs
/// tests and `APP_USE_FAKE_EMBEDDINGS=1`.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dim: usize,
    id: String,
}

impl HashEmbedder {
    /// Fails with `InvalidConfig` for a zero dimension.
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(Error::InvalidConfig("hash embedder dimension must be at least 1".into()));
        }
        Ok(Self { dim, id: format!("hash:xxh64:d{dim}") })
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dim];
        for token in tokens(text) {
            v[self.bucket(&token)] += WORD_WEIGHT;
            let padded: Vec<char> = format!("#{token}#").chars().collect();
            for tri in padded.windows(3) {
                let gram: String = tri.iter().collect();
                v[self.bucket(&gram)] += TRIGRAM_WEIGHT;
            }
        }
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        v
    }

    fn bucket(&self, feature: &str) -> usize {
        let mut hasher = XxHash64::with_seed(0);
        feature.hash(&mut hasher);
        (hasher.finish() % self.dim as u64) as usize
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

impl Embedder for HashEmbedder {
    fn embedder_id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> Option<usize> {
        Some(self.dim)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragdb_core::metric::squared_l2;

    #[test]
    fn normalized_and_deterministic() {
        let e = HashEmbedder::new(64).expect("dim");
        let a = e.embed("Hello, world").expect("embed");
        let b = e.embed("hello world").expect("embed");
        assert_eq!(a.len(), 64);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
        assert_eq!(a, b);
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let e = HashEmbedder::new(16).expect("dim");
        assert_eq!(e.embed("").expect("embed"), vec![0.0; 16]);
        assert_eq!(e.embed("  ...  ").expect("embed"), vec![0.0; 16]);
    }

    #[test]
    fn shared_words_are_closer() {
        let e = HashEmbedder::new(256).expect("dim");
        let q = e.embed("where does alice work").expect("q");
        let alice = e.embed("alice works at acme").expect("alice");
        let bob = e.embed("bob likes tea").expect("bob");
        assert!(squared_l2(&q, &alice) < squared_l2(&q, &bob));
    }

    #[test]
    fn batch_matches_single_calls() {
        let e = HashEmbedder::new(32).expect("dim");
        let texts = vec!["one".to_string(), String::new(), "two three".to_string()];
        let batch = e.embed_batch(&texts).expect("batch");
        for (t, v) in texts.iter().zip(&batch) {
            assert_eq!(&e.embed(t).expect("single"), v);
        }
    }

    #[test]
    fn zero_dimension_is_a_config_error() {
        assert!(matches!(HashEmbedder::new(0), Err(Error::InvalidConfig(_))));
        assert_eq!(HashEmbedder::new(1).expect("dim").embed("x").expect("embed"), vec![1.0]);
    }
}
