use nalgebra::Vector2;
use ndarray::Array2;
use tracing::{debug, trace};

use crate::error::{Result, TrackerError};
use crate::motion::features::{Corner, good_features, region_mask};
use crate::motion::field::MotionField;
use crate::motion::gray::Gray;
use crate::motion::lucas_kanade::LucasKanade;
use crate::motion::params::{FeatureParams, FlowParams};
use crate::motion::pyramid::Pyramid;
use crate::tracker::Rect;

/// Sparse optical flow restricted to regions of interest.
pub struct MotionEstimator {
    features: FeatureParams,
    optical_flow: LucasKanade,
    last_mask: Option<Array2<bool>>,
}

/// Intermediate products of one estimate, kept for debugging.
#[derive(Debug)]
pub struct MotionEstimate {
    pub field: MotionField,
    pub corners: Vec<Corner>,
    pub tracked: usize,
}

impl MotionEstimator {
    pub fn new(features: FeatureParams, flow: FlowParams) -> Self {
        Self {
            features,
            optical_flow: LucasKanade::new(flow),
            last_mask: None,
        }
    }

    /// Displacement field from `prev` to `curr`, sampled at corners found
    /// inside `regions` of `prev`.
    pub fn estimate(&mut self, prev: &Gray, curr: &Gray, regions: &[Rect]) -> Result<MotionField> {
        self.estimate_detailed(prev, curr, regions).map(|e| e.field)
    }

    pub fn estimate_detailed(
        &mut self,
        prev: &Gray,
        curr: &Gray,
        regions: &[Rect],
    ) -> Result<MotionEstimate> {
        if prev.dim() != curr.dim() {
            let (ph, pw) = prev.dim();
            let (ch, cw) = curr.dim();
            return Err(TrackerError::FrameSizeMismatch {
                expected: (pw as u32, ph as u32),
                actual: (cw as u32, ch as u32),
            });
        }
        let (h, w) = prev.dim();
        let mut field = MotionField::empty(w as u32, h as u32);

        let mask = region_mask(w as u32, h as u32, regions);
        let corners = good_features(prev, &mask, &self.features);
        self.last_mask = Some(mask);
        if corners.is_empty() {
            debug!(regions = regions.len(), "no features inside regions");
            return Ok(MotionEstimate {
                field,
                corners,
                tracked: 0,
            });
        }

        let levels = self.optical_flow.params().pyramid_levels;
        let prev_pyramid = Pyramid::compute(prev, levels);
        let curr_pyramid = Pyramid::compute(curr, levels);

        let points: Vec<Vector2<f32>> = corners
            .iter()
            .map(|c| Vector2::new(c.x as f32, c.y as f32))
            .collect();
        let statuses = self.optical_flow.track(&prev_pyramid, &curr_pyramid, &points);

        let mut tracked = 0;
        for (corner, status) in corners.iter().zip(&statuses) {
            match status.position() {
                Some(p) => {
                    let displacement = p - Vector2::new(corner.x as f32, corner.y as f32);
                    field.set(corner.x, corner.y, displacement);
                    tracked += 1;
                }
                None => trace!(x = corner.x, y = corner.y, ?status, "feature lost"),
            }
        }
        debug!(features = corners.len(), tracked, "optical flow estimated");

        Ok(MotionEstimate {
            field,
            corners,
            tracked,
        })
    }

    /// Feature mask used by the most recent estimate.
    pub fn last_mask(&self) -> Option<&Array2<bool>> {
        self.last_mask.as_ref()
    }
}
