use ndarray::{Array1, ArrayView4};
use tracing::warn;

use crate::error::Result;

/// Fixed-length appearance descriptor of one image crop.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding(pub Array1<f32>);

impl Embedding {
    pub fn new(values: Array1<f32>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Euclidean distance in embedding space.
    ///
    /// Embeddings of different length never match: the distance is infinite.
    pub fn distance(&self, other: &Embedding) -> f32 {
        if self.len() != other.len() {
            warn!(
                left = self.len(),
                right = other.len(),
                "comparing embeddings of different length"
            );
            return f32::INFINITY;
        }
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f32>()
            .sqrt()
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(values: Vec<f32>) -> Self {
        Self(Array1::from(values))
    }
}

/// A loaded embedding network.
///
/// Inference is infallible once the model exists; all fallible work happens
/// in [`ModelLoader::load`].
pub trait EmbeddingModel {
    /// Run a forward pass on a `[1, 3, H, W]` normalized tensor.
    fn embed(&self, input: ArrayView4<'_, f32>) -> Embedding;

    /// Square input resolution the network expects.
    fn input_size(&self) -> u32 {
        224
    }
}

/// First phase of the model lifecycle: produce a ready model.
pub trait ModelLoader {
    type Model: EmbeddingModel;

    fn load(&self) -> Result<Self::Model>;
}

impl<F, M> ModelLoader for F
where
    F: Fn() -> Result<M>,
    M: EmbeddingModel,
{
    type Model = M;

    fn load(&self) -> Result<M> {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_distance() {
        let a = Embedding::new(array![0.0, 0.0, 0.0]);
        let b = Embedding::new(array![3.0, 4.0, 0.0]);
        assert_eq!(a.distance(&b), 5.0);
        assert_eq!(b.distance(&a), 5.0);
        assert_eq!(a.distance(&a), 0.0);
    }

    #[test]
    fn test_length_mismatch_never_matches() {
        let a = Embedding::from(vec![1.0, 2.0]);
        let b = Embedding::from(vec![1.0, 2.0, 3.0]);
        assert_eq!(a.distance(&b), f32::INFINITY);
    }
}
