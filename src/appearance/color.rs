use ndarray::{Array1, ArrayView4, Axis};

use crate::appearance::embedding::{Embedding, EmbeddingModel, ModelLoader};
use crate::error::Result;

/// Network-free appearance descriptor: per-channel mean and standard
/// deviation of the normalized crop.
///
/// Cheap and deterministic, useful where no trained re-identification
/// weights are available.
#[derive(Debug, Clone)]
pub struct MeanColorEmbedder {
    input_size: u32,
}

impl Default for MeanColorEmbedder {
    fn default() -> Self {
        Self { input_size: 32 }
    }
}

impl MeanColorEmbedder {
    pub fn new(input_size: u32) -> Self {
        Self { input_size }
    }
}

impl EmbeddingModel for MeanColorEmbedder {
    fn embed(&self, input: ArrayView4<'_, f32>) -> Embedding {
        let channels = input.index_axis(Axis(0), 0);
        let mut values = Vec::with_capacity(6);
        for channel in channels.axis_iter(Axis(0)) {
            values.push(channel.mean().unwrap_or(0.0));
        }
        for channel in channels.axis_iter(Axis(0)) {
            values.push(channel.std(0.0));
        }
        Embedding::new(Array1::from(values))
    }

    fn input_size(&self) -> u32 {
        self.input_size
    }
}

impl ModelLoader for MeanColorEmbedder {
    type Model = MeanColorEmbedder;

    fn load(&self) -> Result<Self::Model> {
        Ok(self.clone())
    }
}
