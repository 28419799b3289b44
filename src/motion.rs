//! Sparse optical flow between consecutive frames.
//!
//! Corners are selected inside the previous frame's detection boxes and
//! tracked into the current frame with pyramidal Lucas-Kanade; the resulting
//! displacements are scattered into a [`MotionField`].

mod estimator;
mod features;
mod field;
mod gray;
mod lucas_kanade;
mod params;
mod pyramid;

pub use estimator::{MotionEstimate, MotionEstimator};
pub use features::{Corner, good_features, region_mask};
pub use field::MotionField;
pub use gray::{Gray, to_gray};
pub use lucas_kanade::{LucasKanade, TrackStatus};
pub use params::{FeatureParams, FlowParams};
pub use pyramid::Pyramid;
