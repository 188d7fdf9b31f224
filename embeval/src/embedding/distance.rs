//! Distance metrics between entity vectors

use crate::error::EvalError;
use ndarray::{Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// Metric used to compare two vectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// 1 - cosine similarity
    Cosine,
    /// L2 distance
    Euclidean,
    /// L1 distance
    Manhattan,
}

impl Default for DistanceMetric {
    fn default() -> Self {
        Self::Cosine
    }
}

impl std::str::FromStr for DistanceMetric {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cosine" => Ok(Self::Cosine),
            "euclidean" | "l2" => Ok(Self::Euclidean),
            "manhattan" | "cityblock" | "l1" => Ok(Self::Manhattan),
            _ => Err(EvalError::config(format!(
                "Invalid distance metric: {}. Valid options: cosine, euclidean, manhattan",
                s
            ))),
        }
    }
}

impl std::fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cosine => write!(f, "cosine"),
            Self::Euclidean => write!(f, "euclidean"),
            Self::Manhattan => write!(f, "manhattan"),
        }
    }
}

impl DistanceMetric {
    /// Distance between two vectors of equal length
    pub fn distance(&self, a: ArrayView1<f32>, b: ArrayView1<f32>) -> f64 {
        match self {
            Self::Cosine => 1.0 - cosine_similarity(a, b),
            Self::Euclidean => squared_euclidean(a, b).sqrt(),
            Self::Manhattan => a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| (*x as f64 - *y as f64).abs())
                .sum(),
        }
    }

    /// Distances between every row of `a` and every row of `b`
    pub fn pairwise(&self, a: ArrayView2<f32>, b: ArrayView2<f32>) -> Array2<f64> {
        Array2::from_shape_fn((a.nrows(), b.nrows()), |(i, j)| {
            self.distance(a.row(i), b.row(j))
        })
    }
}

/// Calculate cosine similarity between two vectors
///
/// Zero-norm vectors have similarity 0 with everything.
pub fn cosine_similarity(a: ArrayView1<f32>, b: ArrayView1<f32>) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a > 0.0 && norm_b > 0.0 {
        dot / (norm_a.sqrt() * norm_b.sqrt())
    } else {
        0.0
    }
}

/// Squared L2 distance
pub fn squared_euclidean(a: ArrayView1<f32>, b: ArrayView1<f32>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = *x as f64 - *y as f64;
            d * d
        })
        .sum()
}
