//! Optional inspection of the tracker's intermediate products.

use std::sync::{Arc, Mutex, PoisonError};

use image::{GrayImage, Luma, Rgb, RgbImage};
use ndarray::Array2;
use tracing::debug;

use crate::motion::MotionField;
use crate::tracker::detection::Frame;
use crate::tracker::identity::TrackId;
use crate::tracker::rect::Rect;

/// Receiver for debug output emitted by [`FlowTracker::update`] when its
/// `debug` flag is set.
///
/// [`FlowTracker::update`]: crate::tracker::FlowTracker::update
pub trait DebugSink {
    /// Region mask the corners were selected from.
    fn feature_mask(&mut self, _frame_index: u64, _mask: &Array2<bool>) {}

    /// Displacements estimated between the previous and the current frame.
    fn motion_field(&mut self, _frame_index: u64, _field: &MotionField) {}

    /// Frame after every detection received its identity.
    fn resolved_frame(&mut self, _frame: &Frame) {}
}

/// Shared sink: the tracker holds one clone while the caller keeps another
/// to read what was collected.
impl<S: DebugSink> DebugSink for Arc<Mutex<S>> {
    fn feature_mask(&mut self, frame_index: u64, mask: &Array2<bool>) {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .feature_mask(frame_index, mask);
    }

    fn motion_field(&mut self, frame_index: u64, field: &MotionField) {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .motion_field(frame_index, field);
    }

    fn resolved_frame(&mut self, frame: &Frame) {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .resolved_frame(frame);
    }
}

/// Writes debug output to the `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DebugSink for TracingSink {
    fn feature_mask(&mut self, frame_index: u64, mask: &Array2<bool>) {
        let covered = mask.iter().filter(|m| **m).count();
        debug!(frame = frame_index, covered, total = mask.len(), "feature mask");
    }

    fn motion_field(&mut self, frame_index: u64, field: &MotionField) {
        debug!(
            frame = frame_index,
            samples = field.sampled_count(),
            "motion field"
        );
    }

    fn resolved_frame(&mut self, frame: &Frame) {
        for det in &frame.detections {
            debug!(frame = frame.index, id = ?det.id, label = %det.label, tlwh = ?det.bbox.to_tlwh(), "resolved");
        }
    }
}

/// Collects rendered images: feature masks and frames with identity-colored
/// boxes.
#[derive(Debug)]
pub struct OverlaySink {
    masks: Vec<(u64, GrayImage)>,
    overlays: Vec<(u64, RgbImage)>,
    thickness: u32,
}

impl Default for OverlaySink {
    fn default() -> Self {
        Self::new(2)
    }
}

impl OverlaySink {
    pub fn new(thickness: u32) -> Self {
        Self {
            masks: Vec::new(),
            overlays: Vec::new(),
            thickness: thickness.max(1),
        }
    }

    pub fn masks(&self) -> &[(u64, GrayImage)] {
        &self.masks
    }

    pub fn overlays(&self) -> &[(u64, RgbImage)] {
        &self.overlays
    }

    /// Hand out and forget everything collected so far.
    pub fn take_overlays(&mut self) -> Vec<(u64, RgbImage)> {
        self.masks.clear();
        std::mem::take(&mut self.overlays)
    }
}

impl DebugSink for OverlaySink {
    fn feature_mask(&mut self, frame_index: u64, mask: &Array2<bool>) {
        let (h, w) = mask.dim();
        let image = GrayImage::from_fn(w as u32, h as u32, |x, y| {
            Luma([if mask[[y as usize, x as usize]] { 255 } else { 0 }])
        });
        self.masks.push((frame_index, image));
    }

    fn resolved_frame(&mut self, frame: &Frame) {
        let mut image = frame.image.clone();
        for det in &frame.detections {
            let color = det.id.map(identity_color).unwrap_or(Rgb([255, 255, 255]));
            draw_rect(&mut image, &det.bbox, color, self.thickness);
        }
        self.overlays.push((frame.index, image));
    }
}

/// Stable display color for an identity.
pub fn identity_color(id: TrackId) -> Rgb<u8> {
    const GOLDEN_RATIO_CONJUGATE: f64 = 0.618_033_988_749_895;
    let hue = (id.0 as f64 * GOLDEN_RATIO_CONJUGATE).fract();
    hsv_to_rgb(hue, 0.75, 0.95)
}

fn hsv_to_rgb(h: f64, s: f64, v: f64) -> Rgb<u8> {
    let sector = h * 6.0;
    let i = sector.floor() as u32 % 6;
    let f = sector - sector.floor();
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    let (r, g, b) = match i {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    let to_u8 = |c: f64| (c * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgb([to_u8(r), to_u8(g), to_u8(b)])
}

/// Outline `rect` inside the image bounds.
pub fn draw_rect(image: &mut RgbImage, rect: &Rect, color: Rgb<u8>, thickness: u32) {
    let span = rect.clip(image.width(), image.height());
    if span.is_empty() {
        return;
    }
    let t = thickness as usize;
    for y in span.y0..span.y1 {
        for x in span.x0..span.x1 {
            let edge = x < span.x0 + t || x + t >= span.x1 || y < span.y0 + t || y + t >= span.y1;
            if edge {
                image.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}
