use anyhow::{anyhow, bail, Context};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use ragdb_core::error::Result;
use ragdb_core::traits::Embedder;

/// Averages pre-trained word vectors (GloVe / word2vec text format).
///
/// Unknown words are ignored; text with no known word maps to the zero vector.
#[derive(Debug, Clone)]
pub struct WordVectorEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    dim: usize,
    id: String,
}

impl WordVectorEmbedder {
    /// Reads `word v1 v2 ...` lines. A leading word2vec `count dim` header is skipped.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let mut vectors = HashMap::new();
        let mut dim = None;
        for (lineno, line) in raw.lines().enumerate() {
            let mut parts = line.split_whitespace();
            let Some(word) = parts.next() else { continue };
            let values = parts
                .map(str::parse::<f32>)
                .collect::<std::result::Result<Vec<_>, _>>()
                .with_context(|| format!("{}:{}: bad vector component", path.display(), lineno + 1))?;
            if lineno == 0 && values.len() == 1 && word.parse::<usize>().is_ok() {
                continue;
            }
            match dim {
                None => dim = Some(values.len()),
                Some(d) if d != values.len() => {
                    bail!("{}:{}: expected {} components, found {}", path.display(), lineno + 1, d, values.len())
                }
                Some(_) => {}
            }
            vectors.insert(word.to_string(), values);
        }
        let name = path.file_stem().map_or_else(|| "vectors".to_string(), |s| s.to_string_lossy().to_string());
        let embedder = Self::from_vectors(&name, vectors)?;
        info!(words = embedder.vectors.len(), dim = embedder.dim, "loaded word vectors from {}", path.display());
        Ok(embedder)
    }

    pub fn from_vectors(name: &str, vectors: HashMap<String, Vec<f32>>) -> anyhow::Result<Self> {
        let dim = vectors.values().next().map(Vec::len).ok_or_else(|| anyhow!("no word vectors"))?;
        if dim == 0 || vectors.values().any(|v| v.len() != dim) {
            bail!("word vectors must share one non-zero dimension");
        }
        Ok(Self { vectors, dim, id: format!("glove:{name}:d{dim}") })
    }

    fn lookup(&self, word: &str) -> Option<&Vec<f32>> {
        self.vectors.get(word).or_else(|| {
            let lower = word.to_lowercase();
            self.vectors.get(&lower).or_else(|| {
                self.vectors.get(lower.trim_matches(|c: char| c.is_ascii_punctuation()))
            })
        })
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut sum = vec![0.0f32; self.dim];
        let mut found = 0usize;
        for vector in text.split_whitespace().filter_map(|w| self.lookup(w)) {
            sum.iter_mut().zip(vector).for_each(|(s, x)| *s += x);
            found += 1;
        }
        if found > 0 {
            sum.iter_mut().for_each(|s| *s /= found as f32);
        }
        sum
    }
}

impl Embedder for WordVectorEmbedder {
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
    use std::io::Write;

    fn write_vectors(body: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().expect("tmp");
        f.write_all(body.as_bytes()).expect("write");
        f
    }

    #[test]
    fn averages_known_words_and_skips_header() {
        let f = write_vectors("3 2\nalice 1.0 0.0\nworks 0.0 1.0\nbob -1.0 0.0\n");
        let e = WordVectorEmbedder::load(f.path()).expect("load");
        assert_eq!(e.dim(), Some(2));
        assert_eq!(e.embed("Alice works, unknown").expect("embed"), vec![0.5, 0.5]);
        assert_eq!(e.embed("").expect("embed"), vec![0.0, 0.0]);
        assert!(e.embedder_id().starts_with("glove:"));
    }

    #[test]
    fn ragged_file_is_rejected() {
        let f = write_vectors("a 1.0 2.0\nb 1.0\n");
        let err = WordVectorEmbedder::load(f.path()).expect_err("ragged");
        assert!(err.to_string().contains("expected 2"), "{err}");
    }
}
