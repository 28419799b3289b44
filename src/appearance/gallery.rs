use std::collections::BTreeMap;

use image::RgbImage;
use tracing::debug;

use crate::appearance::embedding::{Embedding, ModelLoader};
use crate::appearance::matcher::{AppearanceMatcher, nearest};
use crate::error::{Result, TrackerError};
use crate::tracker::{Detection, TrackId};

/// Store of known identities that can re-identify a detection by appearance.
pub trait AppearanceGallery {
    /// Identity whose appearance matches `detection` in `image`, if any.
    ///
    /// Errors are reserved for resource failures such as a model that
    /// cannot be loaded; a miss is `Ok(None)`.
    fn query(&mut self, image: &RgbImage, detection: &Detection) -> Result<Option<TrackId>>;
}

/// Identity to reference-embedding gallery backed by an [`AppearanceMatcher`].
pub struct EmbeddingGallery<L: ModelLoader> {
    matcher: AppearanceMatcher<L>,
    entries: BTreeMap<TrackId, Vec<Embedding>>,
}

impl<L: ModelLoader> EmbeddingGallery<L> {
    pub fn new(matcher: AppearanceMatcher<L>) -> Self {
        Self {
            matcher,
            entries: BTreeMap::new(),
        }
    }

    pub fn matcher(&mut self) -> &mut AppearanceMatcher<L> {
        &mut self.matcher
    }

    pub fn threshold(&self) -> f32 {
        self.matcher.threshold()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: TrackId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Add a reference embedding for `id`.
    pub fn insert(&mut self, id: TrackId, embedding: Embedding) {
        self.entries.entry(id).or_default().push(embedding);
    }

    /// Drop every reference embedding of `id`.
    pub fn remove(&mut self, id: TrackId) -> Option<Vec<Embedding>> {
        self.entries.remove(&id)
    }

    /// Embed the detection's crop and store it under the detection's identity.
    pub fn register(&mut self, image: &RgbImage, detection: &Detection) -> Result<()> {
        let id = detection.id.ok_or(TrackerError::Unresolved)?;
        let embedding = self
            .matcher
            .embed_detection(image, detection)?
            .ok_or_else(|| TrackerError::preprocessing("detection lies outside the image"))?;
        self.insert(id, embedding);
        Ok(())
    }

    /// Closest identity over all reference embeddings with its distance,
    /// regardless of the threshold.
    pub fn nearest(&self, query: &Embedding) -> Option<(TrackId, f32)> {
        nearest(
            query,
            self.entries
                .iter()
                .flat_map(|(id, refs)| refs.iter().map(move |e| (*id, e))),
        )
    }

    /// Closest identity if its distance is strictly below the threshold.
    pub fn query_embedding(&self, query: &Embedding) -> Option<TrackId> {
        self.nearest(query)
            .filter(|(_, d)| self.matcher.is_match(*d))
            .map(|(id, _)| id)
    }
}

impl<L: ModelLoader> AppearanceGallery for EmbeddingGallery<L> {
    fn query(&mut self, image: &RgbImage, detection: &Detection) -> Result<Option<TrackId>> {
        if self.entries.is_empty() {
            return Ok(None);
        }
        let Some(embedding) = self.matcher.embed_detection(image, detection)? else {
            return Ok(None);
        };
        let found = self.query_embedding(&embedding);
        debug!(bbox = ?detection.bbox, ?found, "appearance gallery query");
        Ok(found)
    }
}
