//! Online multi-object tracking for video.
//!
//! Each frame's detections are given persistent identities by a fixed
//! fallback chain:
//!
//! 1. previous boxes are projected forward with sparse optical flow and
//!    matched by overlap,
//! 2. unmatched detections are re-identified against an optional appearance
//!    gallery,
//! 3. anything left gets a freshly allocated identity.
//!
//! ```rust,ignore
//! use flowtrack_rs::{FlowTracker, Frame, TrackerConfig};
//!
//! let mut tracker = FlowTracker::new(TrackerConfig::default())?;
//! for (index, (image, detections)) in video.enumerate() {
//!     let mut frame = Frame::new(index as u64, image, detections);
//!     tracker.update(&mut frame, None, false)?;
//!     for det in &frame.detections {
//!         println!("{} -> {:?}", det.label, det.id);
//!     }
//! }
//! ```

pub mod appearance;
pub mod error;
pub mod integration;
pub mod motion;
pub mod tracker;

pub use appearance::{
    AppearanceGallery, AppearanceMatcher, Embedding, EmbeddingGallery, EmbeddingModel,
    ModelLoader, Preprocessor,
};
pub use error::{Result, TrackerError};
pub use integration::{DetectionBuilder, DetectionSource, TrackerPipeline};
pub use motion::{MotionEstimator, MotionField};
pub use tracker::{
    AppearanceTracker, DebugSink, Detection, FlowTracker, Frame, IdAllocator, OverlaySink, Rect,
    Resolution, TrackId, TrackerConfig, TracingSink,
};
