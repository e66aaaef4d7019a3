//! Distance measures. Smaller is always closer.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Squared Euclidean distance, the flat L2 baseline.
    #[default]
    #[serde(rename = "l2", alias = "squared_l2", alias = "euclidean")]
    SquaredL2,
    /// `1 - cos(a, b)`; a zero vector is at distance 1 from everything.
    Cosine,
}

impl Metric {
    pub fn distance(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Metric::SquaredL2 => squared_l2(a, b),
            Metric::Cosine => 1.0 - cosine_similarity(a, b),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::SquaredL2 => f.write_str("squared_l2"),
            Metric::Cosine => f.write_str("cosine"),
        }
    }
}

pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a == 0.0 || mag_b == 0.0 {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn l2_and_cosine() {
        let a = [1.0, 2.0, 3.0];
        let b = [1.0, 2.0, 5.0];
        assert!((Metric::SquaredL2.distance(&a, &b) - 4.0).abs() < 1e-6);
        assert!(Metric::Cosine.distance(&a, &a).abs() < 1e-6);
        let c = [-1.0, -2.0, -3.0];
        assert!((Metric::Cosine.distance(&a, &c) - 2.0).abs() < 1e-6);
        assert!((Metric::Cosine.distance(&a, &[0.0; 3]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn parses_config_names() {
        let m: Metric = serde_json::from_str("\"l2\"").expect("l2");
        assert_eq!(m, Metric::SquaredL2);
        let m: Metric = serde_json::from_str("\"cosine\"").expect("cosine");
        assert_eq!(m, Metric::Cosine);
    }
}
