//! TrackerPipeline for combining detection with tracking.

use std::fmt::Display;

use image::RgbImage;
use tracing::debug;

use crate::appearance::AppearanceGallery;
use crate::error::{Result, TrackerError};
use crate::tracker::{Detection, FlowTracker, Frame, TrackerConfig};

use super::DetectionSource;

/// Bundles a `DetectionSource` with a `FlowTracker` and numbers the frames.
pub struct TrackerPipeline<D: DetectionSource> {
    detector: D,
    tracker: FlowTracker,
    frame_index: u64,
}

impl<D: DetectionSource> TrackerPipeline<D>
where
    D::Error: Display,
{
    /// Create a new tracking pipeline with the given detector and tracker config.
    pub fn new(detector: D, config: TrackerConfig) -> Result<Self> {
        Ok(Self::with_tracker(detector, FlowTracker::new(config)?))
    }

    /// Create a new tracking pipeline with default tracker configuration.
    pub fn with_default_config(detector: D) -> Result<Self> {
        Self::new(detector, TrackerConfig::default())
    }

    /// Create a new tracking pipeline around an already configured tracker.
    pub fn with_tracker(detector: D, tracker: FlowTracker) -> Self {
        Self {
            detector,
            tracker,
            frame_index: 0,
        }
    }

    /// Detect objects in `image` and resolve their identities.
    ///
    /// The frame index only advances when the frame was tracked.
    pub fn process_frame(
        &mut self,
        image: RgbImage,
        gallery: Option<&mut dyn AppearanceGallery>,
    ) -> Result<Vec<Detection>> {
        let detections = self
            .detector
            .detect(&image)
            .map_err(|e| TrackerError::Detection(e.to_string()))?;
        debug!(frame = self.frame_index, detections = detections.len(), "detected");

        let mut frame = Frame::new(self.frame_index, image, detections);
        self.tracker.update(&mut frame, gallery, false)?;
        self.frame_index += 1;
        Ok(frame.detections)
    }

    /// Index the next processed frame will get.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Get a reference to the underlying detector.
    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// Get a mutable reference to the underlying detector.
    pub fn detector_mut(&mut self) -> &mut D {
        &mut self.detector
    }

    /// Get a reference to the underlying tracker.
    pub fn tracker(&self) -> &FlowTracker {
        &self.tracker
    }

    /// Get a mutable reference to the underlying tracker.
    pub fn tracker_mut(&mut self) -> &mut FlowTracker {
        &mut self.tracker
    }
}
