//! Per-frame tracker input.

use image::RgbImage;

use crate::error::{Result, TrackerError};
use crate::tracker::identity::TrackId;
use crate::tracker::rect::Rect;

/// Labeled bounding box produced by an external detector.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Resolved identity, `None` until the tracker assigns one
    pub id: Option<TrackId>,
    /// Class label reported by the detector
    pub label: String,
    /// Box in source-image pixels
    pub bbox: Rect,
}

impl Detection {
    /// Create an unresolved detection.
    pub fn new(label: impl Into<String>, bbox: Rect) -> Self {
        Self {
            id: None,
            label: label.into(),
            bbox,
        }
    }

    /// Create a detection that already carries an identity.
    pub fn with_id(id: TrackId, label: impl Into<String>, bbox: Rect) -> Self {
        Self {
            id: Some(id),
            label: label.into(),
            bbox,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.id.is_some()
    }

    pub fn iou(&self, other: &Detection) -> f32 {
        self.bbox.iou(&other.bbox)
    }
}

/// One video frame: image plus the detections found in it.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Position of the frame in the sequence
    pub index: u64,
    pub image: RgbImage,
    pub detections: Vec<Detection>,
}

impl Frame {
    pub fn new(index: u64, image: RgbImage, detections: Vec<Detection>) -> Self {
        Self {
            index,
            image,
            detections,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Reject detections with an empty box.
    pub fn validate(&self) -> Result<()> {
        for (index, det) in self.detections.iter().enumerate() {
            if det.bbox.is_empty() {
                return Err(TrackerError::InvalidDetection {
                    index,
                    width: det.bbox.width,
                    height: det.bbox.height,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_empty_boxes() {
        let image = RgbImage::new(32, 32);
        let frame = Frame::new(
            0,
            image,
            vec![
                Detection::new("car", Rect::new(0, 0, 10, 10)),
                Detection::new("car", Rect::new(5, 5, 0, 4)),
            ],
        );

        match frame.validate() {
            Err(TrackerError::InvalidDetection {
                index,
                width,
                height,
            }) => {
                assert_eq!(index, 1);
                assert_eq!((width, height), (0, 4));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_new_detection_is_unresolved() {
        let det = Detection::new("bike", Rect::new(1, 2, 3, 4));
        assert!(!det.is_resolved());
        assert!(Detection::with_id(TrackId(3), "bike", det.bbox).is_resolved());
    }
}
