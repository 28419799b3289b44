//! Integration module for connecting detection and embedding backends with
//! the tracker.
//!
//! This module provides traits and utilities for feeding detections from any
//! inference backend into [`FlowTracker`](crate::tracker::FlowTracker) and,
//! with the `burn-backend` feature, for running appearance networks built
//! with Burn.

mod builder;
mod detector;
mod pipeline;

pub use builder::DetectionBuilder;
pub use detector::DetectionSource;
pub use pipeline::TrackerPipeline;

#[cfg(feature = "burn-backend")]
mod burn_backend;

#[cfg(feature = "burn-backend")]
pub use burn_backend::{BurnEmbedder, BurnEmbeddingNet, BurnModelLoader};
