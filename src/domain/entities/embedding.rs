use serde::{Deserialize, Serialize};

/// A dense vector as produced by the embedding model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding(pub Vec<f32>);

impl Embedding {
    pub fn new(vec: Vec<f32>) -> Self {
        Self(vec)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    /// Cosine similarity in `[-1, 1]`; 0 for mismatched or zero vectors.
    pub fn cosine_similarity(&self, other: &Embedding) -> f32 {
        if self.dimension() != other.dimension() || self.0.is_empty() {
            return 0.0;
        }

        let (dot, norm_a, norm_b) = self
            .0
            .iter()
            .zip(&other.0)
            .fold((0.0f32, 0.0f32, 0.0f32), |(dot, na, nb), (a, b)| {
                (dot + a * b, na + a * a, nb + b * b)
            });

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot / (norm_a.sqrt() * norm_b.sqrt())
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(vec: Vec<f32>) -> Self {
        Self(vec)
    }
}

impl From<Vec<f64>> for Embedding {
    fn from(vec: Vec<f64>) -> Self {
        Self(vec.into_iter().map(|x| x as f32).collect())
    }
}
