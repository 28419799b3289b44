//! Burn inference backend for appearance embeddings.
//!
//! This module provides a `BurnEmbedder` that implements `EmbeddingModel`
//! for re-identification networks built with the Burn framework, and a
//! `BurnModelLoader` that initializes such a network and loads its weights
//! on first use.
//!
//! # Example
//!
//! ```ignore
//! use flowtrack_rs::integration::{BurnEmbeddingNet, BurnModelLoader};
//! use flowtrack_rs::{AppearanceMatcher, EmbeddingGallery};
//! use burn::backend::NdArray;
//!
//! // Implement BurnEmbeddingNet for your siamese branch
//! #[derive(Module, Debug)]
//! struct SiameseNet<B: Backend> { /* ... */ }
//!
//! impl<B: Backend> BurnEmbeddingNet<B> for SiameseNet<B> {
//!     fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 2> {
//!         // Run inference
//!     }
//! }
//!
//! let loader = BurnModelLoader::new("weights/siamese.mpk", Default::default(), SiameseNet::new);
//! let gallery = EmbeddingGallery::new(AppearanceMatcher::new(loader));
//! ```

use std::path::PathBuf;

use burn::prelude::*;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use burn::tensor::Tensor;
use ndarray::ArrayView4;
use tracing::info;

use crate::appearance::{Embedding, EmbeddingModel, ModelLoader};
use crate::error::{Result, TrackerError};

/// Trait for Burn-based embedding networks.
///
/// Implement this trait for your specific model architecture.
pub trait BurnEmbeddingNet<B: Backend> {
    /// Run forward pass on a normalized `[batch, 3, height, width]` tensor
    /// and return one embedding row per batch entry.
    fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 2>;

    /// Square input resolution the network was trained on.
    fn input_size(&self) -> u32 {
        224
    }
}

/// Burn network bound to a device, usable as an `EmbeddingModel`.
pub struct BurnEmbedder<B: Backend, M: BurnEmbeddingNet<B>> {
    model: M,
    device: B::Device,
}

impl<B: Backend, M: BurnEmbeddingNet<B>> BurnEmbedder<B, M> {
    pub fn new(model: M, device: B::Device) -> Self {
        Self { model, device }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    fn to_tensor(&self, input: ArrayView4<'_, f32>) -> Tensor<B, 4> {
        let (n, c, h, w) = input.dim();
        let data: Vec<f32> = input.iter().copied().collect();
        Tensor::<B, 1>::from_floats(data.as_slice(), &self.device).reshape([n, c, h, w])
    }
}

impl<B: Backend, M: BurnEmbeddingNet<B>> EmbeddingModel for BurnEmbedder<B, M> {
    fn embed(&self, input: ArrayView4<'_, f32>) -> Embedding {
        let output = self.model.forward(self.to_tensor(input));
        let values: Vec<f32> = output.into_data().iter::<f32>().collect();
        Embedding::from(values)
    }

    fn input_size(&self) -> u32 {
        self.model.input_size()
    }
}

/// Initializes a Burn module and loads its record file.
pub struct BurnModelLoader<B: Backend, F> {
    weights: PathBuf,
    device: B::Device,
    init: F,
}

impl<B, M, F> BurnModelLoader<B, F>
where
    B: Backend,
    M: Module<B> + BurnEmbeddingNet<B>,
    F: Fn(&B::Device) -> M,
{
    pub fn new(weights: impl Into<PathBuf>, device: B::Device, init: F) -> Self {
        Self {
            weights: weights.into(),
            device,
            init,
        }
    }
}

impl<B, M, F> ModelLoader for BurnModelLoader<B, F>
where
    B: Backend,
    M: Module<B> + BurnEmbeddingNet<B>,
    F: Fn(&B::Device) -> M,
{
    type Model = BurnEmbedder<B, M>;

    fn load(&self) -> Result<Self::Model> {
        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        let model = (self.init)(&self.device)
            .load_file(self.weights.clone(), &recorder, &self.device)
            .map_err(|e| {
                TrackerError::model_load(format!("{}: {e}", self.weights.display()))
            })?;
        info!(weights = %self.weights.display(), "burn embedding network loaded");
        Ok(BurnEmbedder::new(model, self.device.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use ndarray::Array4;
    use std::marker::PhantomData;

    /// Mean of each channel, a stand-in for a trained network.
    #[derive(Module, Debug)]
    struct ChannelMean<B: Backend> {
        phantom: PhantomData<B>,
    }

    fn channel_mean<B: Backend>(_device: &B::Device) -> ChannelMean<B> {
        ChannelMean {
            phantom: PhantomData,
        }
    }

    impl<B: Backend> BurnEmbeddingNet<B> for ChannelMean<B> {
        fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 2> {
            let [n, c, _, _] = input.dims();
            input.flatten::<3>(2, 3).mean_dim(2).reshape([n, c])
        }

        fn input_size(&self) -> u32 {
            8
        }
    }

    #[test]
    fn test_burn_embedder() {
        let device = Default::default();
        let embedder = BurnEmbedder::new(channel_mean::<NdArray>(&device), device);
        let mut input = Array4::zeros((1, 3, 8, 8));
        input.index_axis_mut(ndarray::Axis(1), 1).fill(2.0);

        let embedding = embedder.embed(input.view());
        assert_eq!(embedding.0.to_vec(), vec![0.0, 2.0, 0.0]);
        assert_eq!(EmbeddingModel::input_size(&embedder), 8);
    }

    #[test]
    fn test_missing_weights_is_load_error() {
        let loader = BurnModelLoader::<NdArray, _>::new(
            "/nonexistent/siamese",
            Default::default(),
            channel_mean::<NdArray>,
        );
        assert!(matches!(loader.load(), Err(TrackerError::ModelLoad(_))));
    }
}
