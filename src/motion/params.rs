use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};

/// Shi-Tomasi corner selection parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureParams {
    /// Upper bound on the number of corners kept
    pub max_features: usize,
    /// Minimum accepted response relative to the strongest corner
    pub quality: f32,
    /// Minimum euclidean distance between two kept corners
    pub min_distance: f32,
    /// Side of the window the structure tensor is summed over
    pub block_size: usize,
}

impl Default for FeatureParams {
    fn default() -> Self {
        Self {
            max_features: 500,
            quality: 0.3,
            min_distance: 7.0,
            block_size: 7,
        }
    }
}

/// Pyramidal Lucas-Kanade parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowParams {
    /// Side of the square integration window, must be odd
    pub window_size: usize,
    /// Number of pyramid levels above the full-resolution image
    pub pyramid_levels: usize,
    /// Maximum Gauss-Newton iterations per level
    pub convergence_iters: usize,
    /// Stop iterating once the update is shorter than this, in pixels
    pub convergence_eps: f32,
    /// Smallest accepted eigenvalue of the normalized gradient matrix
    pub min_eigen_threshold: f32,
}

impl Default for FlowParams {
    fn default() -> Self {
        Self {
            window_size: 15,
            pyramid_levels: 3,
            convergence_iters: 10,
            convergence_eps: 0.03,
            min_eigen_threshold: 1e-4,
        }
    }
}

impl FeatureParams {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.quality) || self.quality == 0.0 {
            return Err(TrackerError::config(format!(
                "feature quality must be in (0, 1], got {}",
                self.quality
            )));
        }
        if self.block_size == 0 {
            return Err(TrackerError::config("feature block size must be positive"));
        }
        if self.min_distance < 0.0 {
            return Err(TrackerError::config("feature min distance must be >= 0"));
        }
        Ok(())
    }
}

impl FlowParams {
    pub fn validate(&self) -> Result<()> {
        if self.window_size < 3 || self.window_size % 2 == 0 {
            return Err(TrackerError::config(format!(
                "flow window size must be odd and >= 3, got {}",
                self.window_size
            )));
        }
        if self.convergence_iters == 0 {
            return Err(TrackerError::config("flow needs at least one iteration"));
        }
        if self.convergence_eps.is_nan() || self.convergence_eps <= 0.0 {
            return Err(TrackerError::config("flow convergence eps must be positive"));
        }
        if self.min_eigen_threshold.is_nan() || self.min_eigen_threshold < 0.0 {
            return Err(TrackerError::config(format!(
                "flow min eigen threshold must be >= 0, got {}",
                self.min_eigen_threshold
            )));
        }
        Ok(())
    }
}
