//! Builder for creating Detection objects from various box formats.

use crate::tracker::{Detection, Rect};

/// Builder for unresolved `Detection` objects.
///
/// Coordinates are floating point as most detectors report them and are
/// rounded to whole pixels on [`build`](DetectionBuilder::build).
#[derive(Debug, Clone, Default)]
pub struct DetectionBuilder {
    label: String,
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
}

impl DetectionBuilder {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }

    /// Set bounding box in TLBR format (x1, y1, x2, y2), bottom-right exclusive.
    pub fn tlbr(mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        self.x1 = x1;
        self.y1 = y1;
        self.x2 = x2;
        self.y2 = y2;
        self
    }

    /// Set bounding box in XYWH format (center_x, center_y, width, height).
    pub fn xywh(mut self, cx: f32, cy: f32, w: f32, h: f32) -> Self {
        self.x1 = cx - w / 2.0;
        self.y1 = cy - h / 2.0;
        self.x2 = cx + w / 2.0;
        self.y2 = cy + h / 2.0;
        self
    }

    /// Set bounding box in TLWH format (left, top, width, height).
    pub fn tlwh(mut self, x: f32, y: f32, w: f32, h: f32) -> Self {
        self.x1 = x;
        self.y1 = y;
        self.x2 = x + w;
        self.y2 = y + h;
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Build the final `Detection`.
    pub fn build(self) -> Detection {
        let rect = Rect::from_tlbr(
            self.x1.round() as i32,
            self.y1.round() as i32,
            self.x2.round() as i32,
            self.y2.round() as i32,
        );
        Detection::new(self.label, rect)
    }
}
