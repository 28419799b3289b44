//! Trait for object detection inference backends.

use image::RgbImage;

use crate::tracker::Detection;

/// Trait for object detection inference backends.
///
/// Implement this trait to feed any detection model into the tracker.
///
/// # Example
///
/// ```ignore
/// use flowtrack_rs::{DetectionBuilder, DetectionSource, Detection};
/// use image::RgbImage;
///
/// struct MyDetector {
///     // Your model here
/// }
///
/// impl DetectionSource for MyDetector {
///     type Error = std::io::Error;
///
///     fn detect(&mut self, image: &RgbImage) -> Result<Vec<Detection>, Self::Error> {
///         Ok(vec![DetectionBuilder::new("car").tlbr(10.0, 20.0, 50.0, 80.0).build()])
///     }
/// }
/// ```
pub trait DetectionSource {
    /// Error type for detection failures.
    type Error;

    /// Run inference on one frame and return unresolved detections in a
    /// stable order.
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<Detection>, Self::Error>;
}
