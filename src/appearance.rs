//! Appearance re-identification.
//!
//! Crops are resized and normalized, embedded by a lazily loaded model and
//! compared by euclidean distance. A distance strictly below the threshold
//! means "same object".

mod color;
mod embedding;
mod gallery;
mod matcher;
mod preprocess;

pub use color::MeanColorEmbedder;
pub use embedding::{Embedding, EmbeddingModel, ModelLoader};
pub use gallery::{AppearanceGallery, EmbeddingGallery};
pub use matcher::{AppearanceMatcher, DEFAULT_APPEARANCE_THRESHOLD, nearest};
pub use preprocess::{Preprocessor, crop_image};
