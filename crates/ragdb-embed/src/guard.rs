use std::sync::OnceLock;

use ragdb_core::error::{Error, Result};
use ragdb_core::traits::Embedder;

/// Pins the output dimension of an embedder.
///
/// The dimension comes from the provider when it reports one, otherwise
/// from the first vector produced. Every later vector must match it, and a
/// batch must yield exactly one vector per input.
pub struct DimensionGuard<E> {
    inner: E,
    dim: OnceLock<usize>,
}

impl<E: Embedder> DimensionGuard<E> {
    pub fn new(inner: E) -> Self {
        let dim = OnceLock::new();
        if let Some(d) = inner.dim() {
            let _ = dim.set(d);
        }
        Self { inner, dim }
    }

    /// Requires the guard to produce `expected`-dimensional vectors.
    pub fn pin(&self, expected: usize) -> Result<()> {
        self.check(expected)
    }

    fn check(&self, actual: usize) -> Result<()> {
        let expected = *self.dim.get_or_init(|| actual);
        if expected != actual {
            return Err(Error::DimensionMismatch { expected, actual });
        }
        Ok(())
    }
}

impl<E: Embedder> Embedder for DimensionGuard<E> {
    fn embedder_id(&self) -> &str {
        self.inner.embedder_id()
    }

    fn dim(&self) -> Option<usize> {
        self.dim.get().copied()
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let vectors = self.inner.embed_batch(texts)?;
        if vectors.len() != texts.len() {
            return Err(Error::Provider(anyhow::anyhow!(
                "provider returned {} vectors for {} inputs",
                vectors.len(),
                texts.len()
            )));
        }
        for v in &vectors {
            self.check(v.len())?;
        }
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Emits vectors whose length is the input's character count.
    struct LengthEcho;

    impl Embedder for LengthEcho {
        fn embedder_id(&self) -> &str {
            "echo"
        }
        fn dim(&self) -> Option<usize> {
            None
        }
        fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| vec![1.0; t.chars().count()]).collect())
        }
    }

    #[test]
    fn first_vector_fixes_the_dimension() {
        let g = DimensionGuard::new(LengthEcho);
        assert_eq!(g.dim(), None);
        g.embed("abc").expect("first");
        assert_eq!(g.dim(), Some(3));
        assert!(matches!(
            g.embed("abcd"),
            Err(Error::DimensionMismatch { expected: 3, actual: 4 })
        ));
        g.embed("xyz").expect("same width");
    }

    #[test]
    fn pin_conflicts_with_observed_dimension() {
        let g = DimensionGuard::new(LengthEcho);
        g.pin(2).expect("pin");
        assert!(matches!(g.embed("abc"), Err(Error::DimensionMismatch { expected: 2, actual: 3 })));
        assert!(g.pin(5).is_err());
    }
}
