//! Appearance-only tracker matching consecutive frames by embedding distance.

use tracing::{debug, instrument};

use crate::appearance::{AppearanceMatcher, Embedding, ModelLoader};
use crate::error::Result;
use crate::tracker::detection::{Detection, Frame};
use crate::tracker::identity::IdAllocator;
use crate::tracker::matching;
use crate::tracker::resolution::Resolution;

/// Distance given to pairs where a crop could not be embedded.
const MISSING_COST: f32 = 1e3;

struct PreviousFrame {
    detections: Vec<Detection>,
    embeddings: Vec<Option<Embedding>>,
}

/// Tracker that relies on appearance alone.
///
/// Every crop of the current frame is compared with every crop of the
/// previous frame; pairs are assigned one-to-one by minimum total distance
/// and kept when the distance is below the matcher threshold.
pub struct AppearanceTracker<L: ModelLoader> {
    matcher: AppearanceMatcher<L>,
    allocator: IdAllocator,
    previous: Option<PreviousFrame>,
}

impl<L: ModelLoader> AppearanceTracker<L> {
    pub fn new(matcher: AppearanceMatcher<L>) -> Self {
        Self::with_allocator(matcher, IdAllocator::new())
    }

    pub fn with_allocator(matcher: AppearanceMatcher<L>, allocator: IdAllocator) -> Self {
        Self {
            matcher,
            allocator,
            previous: None,
        }
    }

    pub fn matcher(&mut self) -> &mut AppearanceMatcher<L> {
        &mut self.matcher
    }

    pub fn allocator(&self) -> &IdAllocator {
        &self.allocator
    }

    pub fn previous_detections(&self) -> Option<&[Detection]> {
        self.previous.as_ref().map(|p| p.detections.as_slice())
    }

    pub fn reset(&mut self) {
        self.previous = None;
    }

    #[instrument(skip_all, fields(frame = frame.index, detections = frame.detections.len()))]
    pub fn update(&mut self, frame: &mut Frame) -> Result<()> {
        frame.validate()?;

        let embeddings = frame
            .detections
            .iter()
            .map(|det| self.matcher.embed_detection(&frame.image, det))
            .collect::<Result<Vec<_>>>()?;

        let mut resolutions = vec![Resolution::Unmatched; frame.detections.len()];
        if let Some(prev) = &self.previous {
            let dists = matching::embedding_distance(&embeddings, &prev.embeddings, MISSING_COST);
            let assignment = matching::linear_assignment(&dists, self.matcher.threshold());
            for (current, previous) in assignment.matches {
                resolutions[current] = prev.detections[previous].id.into();
            }
            debug!(
                matched = resolutions.iter().filter(|r| r.is_matched()).count(),
                previous = prev.detections.len(),
                "appearance assignment"
            );
        }

        for (det, resolution) in frame.detections.iter_mut().zip(resolutions) {
            det.id = Some(match resolution {
                Resolution::Matched(id) => id,
                Resolution::Unmatched => self.allocator.next(),
            });
        }

        self.previous = Some(PreviousFrame {
            detections: frame.detections.clone(),
            embeddings,
        });
        Ok(())
    }
}
