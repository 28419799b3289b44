use serde::{Deserialize, Serialize};

use crate::appearance::{AppearanceMatcher, DEFAULT_APPEARANCE_THRESHOLD, ModelLoader};
use crate::error::{Result, TrackerError};
use crate::motion::{FeatureParams, FlowParams};

/// Configuration for the trackers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Corner selection inside the previous detections
    pub features: FeatureParams,
    /// Lucas-Kanade tracking of the selected corners
    pub flow: FlowParams,
    /// IoU a projected box must exceed to hand over its identity
    pub overlap_threshold: f32,
    /// Embedding distance below which two crops are the same object
    pub appearance_threshold: f32,
    /// Frames an identity is remembered for. Only the previous frame is
    /// retained, so every value above 1 behaves like 1.
    pub look_back: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            features: FeatureParams::default(),
            flow: FlowParams::default(),
            overlap_threshold: 0.5,
            appearance_threshold: DEFAULT_APPEARANCE_THRESHOLD,
            look_back: 3,
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<()> {
        self.features.validate()?;
        self.flow.validate()?;
        if !(0.0..1.0).contains(&self.overlap_threshold) {
            return Err(TrackerError::config(format!(
                "overlap threshold must be in [0, 1), got {}",
                self.overlap_threshold
            )));
        }
        if self.appearance_threshold.is_nan() || self.appearance_threshold <= 0.0 {
            return Err(TrackerError::config(format!(
                "appearance threshold must be positive, got {}",
                self.appearance_threshold
            )));
        }
        if self.look_back == 0 {
            return Err(TrackerError::config("look back must be at least one frame"));
        }
        Ok(())
    }

    /// Matcher for `loader` using this configuration's appearance threshold.
    pub fn appearance_matcher<L: ModelLoader>(&self, loader: L) -> AppearanceMatcher<L> {
        AppearanceMatcher::new(loader).with_threshold(self.appearance_threshold)
    }
}
