use image::RgbImage;
use tracing::{debug, info};

use crate::appearance::embedding::{Embedding, EmbeddingModel, ModelLoader};
use crate::appearance::preprocess::{Preprocessor, crop_image};
use crate::error::Result;
use crate::tracker::{Detection, TrackId};

/// Default distance below which two crops are the same object.
pub const DEFAULT_APPEARANCE_THRESHOLD: f32 = 0.75;

/// Embeds crops with a lazily loaded model and compares them.
///
/// The model is loaded on the first call that needs it. A failed load is
/// returned to the caller and attempted again on the next call; once loaded
/// the model stays resident until [`AppearanceMatcher::unload`] or drop.
pub struct AppearanceMatcher<L: ModelLoader> {
    loader: L,
    model: Option<L::Model>,
    preprocessor: Preprocessor,
    threshold: f32,
}

impl<L: ModelLoader> AppearanceMatcher<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            model: None,
            preprocessor: Preprocessor::default(),
            threshold: DEFAULT_APPEARANCE_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Override the normalization constants used before inference.
    pub fn with_preprocessor(mut self, preprocessor: Preprocessor) -> Self {
        self.preprocessor = preprocessor;
        self
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    /// Load the model if needed and return it.
    pub fn load(&mut self) -> Result<&L::Model> {
        let model = match self.model.take() {
            Some(model) => model,
            None => {
                let model = self.loader.load()?;
                let size = model.input_size();
                if size != self.preprocessor.input_size() {
                    self.preprocessor = self.preprocessor.clone().with_input_size(size);
                }
                info!(input_size = size, "appearance model loaded");
                model
            }
        };
        Ok(&*self.model.insert(model))
    }

    /// Release the loaded model, if any.
    pub fn unload(&mut self) -> Option<L::Model> {
        self.model.take()
    }

    /// Embedding of a whole crop.
    pub fn embed(&mut self, crop: &RgbImage) -> Result<Embedding> {
        // loading first fixes the preprocessor resolution
        self.load()?;
        let tensor = self.preprocessor.to_tensor(crop)?;
        let model = self.load()?;
        Ok(model.embed(tensor.view()))
    }

    /// Embedding of the detection's box in `image`, `None` when the box lies
    /// outside the image.
    pub fn embed_detection(
        &mut self,
        image: &RgbImage,
        detection: &Detection,
    ) -> Result<Option<Embedding>> {
        match crop_image(image, &detection.bbox) {
            Some(crop) => self.embed(&crop).map(Some),
            None => {
                debug!(bbox = ?detection.bbox, "detection outside image, nothing to embed");
                Ok(None)
            }
        }
    }

    /// Appearance dissimilarity of two crops.
    pub fn compare(&mut self, a: &RgbImage, b: &RgbImage) -> Result<f32> {
        let ea = self.embed(a)?;
        let eb = self.embed(b)?;
        Ok(ea.distance(&eb))
    }

    /// Whether a distance counts as the same object. The threshold itself is
    /// not a match.
    pub fn is_match(&self, distance: f32) -> bool {
        distance < self.threshold
    }
}

/// Closest candidate to `query`; ties keep the earliest candidate.
pub fn nearest<'a, I>(query: &Embedding, candidates: I) -> Option<(TrackId, f32)>
where
    I: IntoIterator<Item = (TrackId, &'a Embedding)>,
{
    candidates
        .into_iter()
        .map(|(id, e)| (id, query.distance(e)))
        .fold(None, |best, (id, d)| match best {
            Some((_, best_d)) if best_d <= d => best,
            _ => Some((id, d)),
        })
}
