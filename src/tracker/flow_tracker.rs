//! Optical-flow tracker: projection, overlap, appearance, new identity.

use std::collections::HashSet;

use tracing::{debug, instrument};

use crate::appearance::AppearanceGallery;
use crate::error::{Result, TrackerError};
use crate::motion::{Gray, MotionEstimator, MotionField, to_gray};
use crate::tracker::config::TrackerConfig;
use crate::tracker::debug::DebugSink;
use crate::tracker::detection::{Detection, Frame};
use crate::tracker::identity::{IdAllocator, TrackId};
use crate::tracker::matching;
use crate::tracker::rect::Rect;
use crate::tracker::resolution::Resolution;

struct PreviousFrame {
    index: u64,
    gray: Gray,
    detections: Vec<Detection>,
}

impl PreviousFrame {
    fn dimensions(&self) -> (u32, u32) {
        let (h, w) = self.gray.dim();
        (w as u32, h as u32)
    }
}

/// Online tracker assigning persistent identities to per-frame detections.
pub struct FlowTracker {
    config: TrackerConfig,
    estimator: MotionEstimator,
    allocator: IdAllocator,
    previous: Option<PreviousFrame>,
    debug_sink: Option<Box<dyn DebugSink + Send>>,
}

impl FlowTracker {
    pub fn new(config: TrackerConfig) -> Result<Self> {
        Self::with_allocator(config, IdAllocator::new())
    }

    /// Tracker drawing identities from a shared allocator.
    pub fn with_allocator(config: TrackerConfig, allocator: IdAllocator) -> Result<Self> {
        config.validate()?;
        let estimator = MotionEstimator::new(config.features.clone(), config.flow.clone());
        Ok(Self {
            config,
            estimator,
            allocator,
            previous: None,
            debug_sink: None,
        })
    }

    /// Attach a sink for `update(.., debug = true)`. Pass an
    /// `Arc<Mutex<S>>` clone to keep reading the sink afterwards.
    pub fn with_debug_sink(mut self, sink: impl DebugSink + Send + 'static) -> Self {
        self.debug_sink = Some(Box::new(sink));
        self
    }

    pub fn set_debug_sink(&mut self, sink: Option<Box<dyn DebugSink + Send>>) {
        self.debug_sink = sink;
    }

    pub fn debug_sink_mut(&mut self) -> Option<&mut (dyn DebugSink + Send + 'static)> {
        self.debug_sink.as_deref_mut()
    }

    /// Detach the sink, handing it back to the caller.
    pub fn take_debug_sink(&mut self) -> Option<Box<dyn DebugSink + Send>> {
        self.debug_sink.take()
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn allocator(&self) -> &IdAllocator {
        &self.allocator
    }

    /// Resolved detections of the last processed frame.
    pub fn previous_detections(&self) -> Option<&[Detection]> {
        self.previous.as_ref().map(|p| p.detections.as_slice())
    }

    /// Forget the previous frame. Identities issued so far stay issued.
    pub fn reset(&mut self) {
        self.previous = None;
    }

    /// Assign an identity to every detection of `frame`, then remember the
    /// frame for the next call.
    ///
    /// Identities are unique within the frame. On error no identity is
    /// written and the previous frame is kept.
    #[instrument(skip_all, fields(frame = frame.index, detections = frame.detections.len()))]
    pub fn update(
        &mut self,
        frame: &mut Frame,
        gallery: Option<&mut dyn AppearanceGallery>,
        debug: bool,
    ) -> Result<()> {
        frame.validate()?;
        if let Some(prev) = &self.previous {
            let expected = prev.dimensions();
            let actual = frame.dimensions();
            if expected != actual {
                return Err(TrackerError::FrameSizeMismatch { expected, actual });
            }
        }

        let gray = to_gray(&frame.image);
        let sink = if debug { self.debug_sink.as_deref_mut() } else { None };

        let projected = match &self.previous {
            Some(prev) => {
                let regions: Vec<Rect> = prev.detections.iter().map(|d| d.bbox).collect();
                let estimate = self
                    .estimator
                    .estimate_detailed(&prev.gray, &gray, &regions)?;
                if let Some(sink) = sink {
                    if let Some(mask) = self.estimator.last_mask() {
                        sink.feature_mask(frame.index, mask);
                    }
                    sink.motion_field(frame.index, &estimate.field);
                }
                debug!(
                    previous = prev.index,
                    features = estimate.corners.len(),
                    tracked = estimate.tracked,
                    "projected previous detections"
                );
                project_detections(&prev.detections, &estimate.field)
            }
            None => Vec::new(),
        };

        let mut resolutions =
            matching::resolve_by_overlap(&frame.detections, projected, self.config.overlap_threshold);
        let by_overlap = resolutions.iter().filter(|r| r.is_matched()).count();

        let mut claimed: HashSet<TrackId> = resolutions.iter().filter_map(|r| r.id()).collect();
        let mut by_appearance = 0;
        if let Some(gallery) = gallery {
            for (det, resolution) in frame.detections.iter().zip(resolutions.iter_mut()) {
                if resolution.is_matched() {
                    continue;
                }
                match gallery.query(&frame.image, det)? {
                    Some(id) if claimed.insert(id) => {
                        *resolution = Resolution::Matched(id);
                        by_appearance += 1;
                    }
                    Some(id) => debug!(%id, "appearance match already claimed, ignored"),
                    None => {}
                }
            }
        }

        let mut created = 0;
        for (det, resolution) in frame.detections.iter_mut().zip(resolutions) {
            let id = match resolution {
                Resolution::Matched(id) => id,
                Resolution::Unmatched => {
                    created += 1;
                    self.allocator.next()
                }
            };
            det.id = Some(id);
        }
        debug!(by_overlap, by_appearance, created, "identities resolved");

        if debug {
            if let Some(sink) = self.debug_sink.as_deref_mut() {
                sink.resolved_frame(frame);
            }
        }

        self.previous = Some(PreviousFrame {
            index: frame.index,
            gray,
            detections: frame.detections.clone(),
        });
        Ok(())
    }
}

/// Shift every detection by the mean displacement sampled inside its box,
/// rounded to whole pixels. Boxes without samples keep their position.
pub fn project_detections(detections: &[Detection], field: &MotionField) -> Vec<Detection> {
    detections
        .iter()
        .map(|det| {
            let mut projected = det.clone();
            if let Some(mean) = field.mean_displacement(&det.bbox) {
                projected.bbox = det
                    .bbox
                    .translate(mean.x.round() as i32, mean.y.round() as i32);
            }
            projected
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use crate::tracker::debug::{OverlaySink, identity_color};
    use nalgebra::Vector2;
    use std::sync::{Arc, Mutex};

    /// Gallery returning a fixed answer and counting its queries.
    struct FixedGallery {
        answer: Option<TrackId>,
        queries: usize,
    }

    impl AppearanceGallery for FixedGallery {
        fn query(&mut self, _image: &RgbImage, _detection: &Detection) -> Result<Option<TrackId>> {
            self.queries += 1;
            Ok(self.answer)
        }
    }

    struct FailingGallery;

    impl AppearanceGallery for FailingGallery {
        fn query(&mut self, _image: &RgbImage, _detection: &Detection) -> Result<Option<TrackId>> {
            Err(TrackerError::model_load("weights missing"))
        }
    }

    fn flat(index: u64, detections: Vec<Detection>) -> Frame {
        Frame::new(index, RgbImage::from_pixel(200, 150, Rgb([90, 90, 90])), detections)
    }

    fn car(x: i32, y: i32, w: u32, h: u32) -> Detection {
        Detection::new("car", Rect::new(x, y, w, h))
    }

    fn ids(frame: &Frame) -> Vec<u64> {
        frame.detections.iter().map(|d| d.id.unwrap().0).collect()
    }

    #[test]
    fn test_first_frame_gets_fresh_identities() {
        let mut tracker = FlowTracker::new(TrackerConfig::default()).unwrap();
        let mut frame = flat(0, vec![car(10, 10, 40, 40), car(100, 50, 30, 30)]);

        tracker.update(&mut frame, None, false).unwrap();

        assert_eq!(ids(&frame), vec![1, 2]);
        assert_eq!(tracker.previous_detections().unwrap().len(), 2);
    }

    #[test]
    fn test_overlap_keeps_identity() {
        let mut tracker = FlowTracker::new(TrackerConfig::default()).unwrap();
        let mut first = flat(0, vec![car(10, 10, 40, 40)]);
        tracker.update(&mut first, None, false).unwrap();

        let mut second = flat(1, vec![car(12, 11, 40, 40)]);
        tracker.update(&mut second, None, false).unwrap();

        assert_eq!(ids(&second), vec![1]);
        assert_eq!(tracker.allocator().issued(), 1);
    }

    #[test]
    fn test_overlap_takes_priority_over_gallery() {
        let mut tracker = FlowTracker::new(TrackerConfig::default()).unwrap();
        let mut first = flat(0, vec![car(10, 10, 40, 40)]);
        tracker.update(&mut first, None, false).unwrap();
        let seeded = first.detections[0].id.unwrap();

        let mut gallery = FixedGallery {
            answer: Some(TrackId(99)),
            queries: 0,
        };
        let mut second = flat(1, vec![car(11, 10, 40, 40)]);
        tracker.update(&mut second, Some(&mut gallery), false).unwrap();

        assert_eq!(second.detections[0].id, Some(seeded));
        assert_eq!(gallery.queries, 0);
    }

    #[test]
    fn test_low_overlap_falls_back_to_gallery() {
        let mut tracker = FlowTracker::new(TrackerConfig::default()).unwrap();
        let mut first = flat(0, vec![car(10, 10, 40, 40)]);
        tracker.update(&mut first, None, false).unwrap();

        let mut gallery = FixedGallery {
            answer: Some(TrackId(42)),
            queries: 0,
        };
        let mut second = flat(1, vec![car(120, 80, 40, 40)]);
        tracker.update(&mut second, Some(&mut gallery), false).unwrap();

        assert_eq!(ids(&second), vec![42]);
        assert_eq!(gallery.queries, 1);
    }

    #[test]
    fn test_low_overlap_without_gallery_is_new() {
        let mut tracker = FlowTracker::new(TrackerConfig::default()).unwrap();
        let mut first = flat(0, vec![car(10, 10, 40, 40)]);
        tracker.update(&mut first, None, false).unwrap();

        let mut second = flat(1, vec![car(120, 80, 40, 40)]);
        tracker.update(&mut second, None, false).unwrap();

        assert_eq!(ids(&second), vec![2]);
    }

    #[test]
    fn test_identities_unique_within_frame() {
        let mut tracker = FlowTracker::new(TrackerConfig::default()).unwrap();
        let mut first = flat(0, vec![car(10, 10, 40, 40)]);
        tracker.update(&mut first, None, false).unwrap();

        // Both overlap the single previous box; the gallery keeps answering
        // with the already claimed identity.
        let mut gallery = FixedGallery {
            answer: Some(TrackId(1)),
            queries: 0,
        };
        let mut second = flat(1, vec![car(11, 10, 40, 40), car(9, 11, 40, 40)]);
        tracker.update(&mut second, Some(&mut gallery), false).unwrap();

        assert_eq!(ids(&second), vec![1, 2]);
        assert_eq!(gallery.queries, 1);
    }

    #[test]
    fn test_empty_frame_clears_previous() {
        let mut tracker = FlowTracker::new(TrackerConfig::default()).unwrap();
        let mut first = flat(0, vec![car(10, 10, 40, 40)]);
        tracker.update(&mut first, None, false).unwrap();

        let mut empty = flat(1, vec![]);
        tracker.update(&mut empty, None, false).unwrap();
        assert_eq!(tracker.previous_detections(), Some(&[][..]));

        let mut third = flat(2, vec![car(10, 10, 40, 40)]);
        tracker.update(&mut third, None, false).unwrap();
        assert_eq!(ids(&third), vec![2]);
    }

    #[test]
    fn test_invalid_detection_rejected_untouched() {
        let mut tracker = FlowTracker::new(TrackerConfig::default()).unwrap();
        let mut frame = flat(0, vec![car(10, 10, 40, 40), car(5, 5, 0, 10)]);

        let err = tracker.update(&mut frame, None, false).unwrap_err();
        assert!(matches!(err, TrackerError::InvalidDetection { index: 1, .. }));
        assert!(frame.detections.iter().all(|d| d.id.is_none()));
        assert!(tracker.previous_detections().is_none());
        assert_eq!(tracker.allocator().issued(), 0);
    }

    #[test]
    fn test_frame_size_change_rejected() {
        let mut tracker = FlowTracker::new(TrackerConfig::default()).unwrap();
        let mut first = flat(0, vec![car(10, 10, 40, 40)]);
        tracker.update(&mut first, None, false).unwrap();

        let mut resized = Frame::new(1, RgbImage::new(100, 100), vec![car(10, 10, 40, 40)]);
        let err = tracker.update(&mut resized, None, false).unwrap_err();
        assert!(matches!(
            err,
            TrackerError::FrameSizeMismatch {
                expected: (200, 150),
                actual: (100, 100)
            }
        ));
        assert!(resized.detections[0].id.is_none());
    }

    #[test]
    fn test_gallery_failure_leaves_state() {
        let mut tracker = FlowTracker::new(TrackerConfig::default()).unwrap();
        let mut first = flat(0, vec![car(10, 10, 40, 40)]);
        tracker.update(&mut first, None, false).unwrap();

        let mut second = flat(1, vec![car(120, 80, 40, 40)]);
        let err = tracker
            .update(&mut second, Some(&mut FailingGallery), false)
            .unwrap_err();
        assert!(matches!(err, TrackerError::ModelLoad(_)));
        assert!(second.detections[0].id.is_none());
        assert_eq!(tracker.previous_detections().unwrap()[0].bbox, Rect::new(10, 10, 40, 40));
    }

    #[test]
    fn test_shared_allocator() {
        let allocator = IdAllocator::new();
        let mut a = FlowTracker::with_allocator(TrackerConfig::default(), allocator.clone()).unwrap();
        let mut b = FlowTracker::with_allocator(TrackerConfig::default(), allocator.clone()).unwrap();

        let mut fa = flat(0, vec![car(0, 0, 10, 10)]);
        let mut fb = flat(0, vec![car(0, 0, 10, 10)]);
        a.update(&mut fa, None, false).unwrap();
        b.update(&mut fb, None, false).unwrap();

        assert_eq!(ids(&fa), vec![1]);
        assert_eq!(ids(&fb), vec![2]);
        assert_eq!(allocator.issued(), 2);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = TrackerConfig {
            look_back: 0,
            ..Default::default()
        };
        assert!(FlowTracker::new(config).is_err());
    }

    #[test]
    fn test_project_uniform_motion() {
        let field = MotionField::uniform(200, 150, Vector2::new(5.0, -3.0));
        let prev = vec![Detection::with_id(TrackId(3), "car", Rect::new(20, 30, 40, 40))];

        let projected = project_detections(&prev, &field);

        assert_eq!(projected[0].bbox, Rect::new(25, 27, 40, 40));
        assert_eq!(projected[0].id, Some(TrackId(3)));
    }

    #[test]
    fn test_project_rounds_and_keeps_unsampled() {
        let mut field = MotionField::empty(100, 100);
        field.set(12, 12, Vector2::new(1.6, -0.4));
        let prev = vec![
            Detection::with_id(TrackId(1), "car", Rect::new(10, 10, 5, 5)),
            Detection::with_id(TrackId(2), "car", Rect::new(50, 50, 5, 5)),
        ];

        let projected = project_detections(&prev, &field);

        assert_eq!(projected[0].bbox, Rect::new(12, 10, 5, 5));
        assert_eq!(projected[1].bbox, Rect::new(50, 50, 5, 5));
    }

    /// Sink logging which hooks fired, for which frame.
    #[derive(Default)]
    struct RecordingSink {
        events: Vec<(&'static str, u64)>,
    }

    impl DebugSink for RecordingSink {
        fn feature_mask(&mut self, frame_index: u64, _mask: &ndarray::Array2<bool>) {
            self.events.push(("mask", frame_index));
        }

        fn motion_field(&mut self, frame_index: u64, _field: &MotionField) {
            self.events.push(("field", frame_index));
        }

        fn resolved_frame(&mut self, frame: &Frame) {
            self.events.push(("frame", frame.index));
        }
    }

    #[test]
    fn test_debug_sink_only_when_requested() {
        let sink = Arc::new(Mutex::new(RecordingSink::default()));
        let mut tracker = FlowTracker::new(TrackerConfig::default())
            .unwrap()
            .with_debug_sink(sink.clone());

        let mut first = flat(0, vec![car(10, 10, 40, 40)]);
        tracker.update(&mut first, None, false).unwrap();
        assert!(sink.lock().unwrap().events.is_empty());

        let mut second = flat(1, vec![car(10, 10, 40, 40)]);
        tracker.update(&mut second, None, true).unwrap();

        assert_eq!(ids(&second), vec![1]);
        assert_eq!(
            sink.lock().unwrap().events,
            vec![("mask", 1), ("field", 1), ("frame", 1)]
        );
    }

    #[test]
    fn test_first_frame_skips_motion_estimation() {
        let sink = Arc::new(Mutex::new(RecordingSink::default()));
        let mut tracker = FlowTracker::new(TrackerConfig::default())
            .unwrap()
            .with_debug_sink(sink.clone());

        let mut first = flat(0, vec![car(10, 10, 40, 40), car(100, 60, 30, 30)]);
        tracker.update(&mut first, None, true).unwrap();

        assert_eq!(sink.lock().unwrap().events, vec![("frame", 0)]);
        assert_eq!(ids(&first), vec![1, 2]);
    }

    #[test]
    fn test_first_frame_resolved_by_gallery() {
        let mut tracker = FlowTracker::new(TrackerConfig::default()).unwrap();
        let mut gallery = FixedGallery {
            answer: Some(TrackId(42)),
            queries: 0,
        };

        let mut first = flat(0, vec![car(10, 10, 40, 40)]);
        tracker.update(&mut first, Some(&mut gallery), false).unwrap();

        assert_eq!(ids(&first), vec![42]);
        assert_eq!(gallery.queries, 1);
        assert_eq!(tracker.allocator().issued(), 0);
    }

    #[test]
    fn test_overlay_sink_readable_after_update() {
        let overlay = Arc::new(Mutex::new(OverlaySink::default()));
        let mut tracker = FlowTracker::new(TrackerConfig::default())
            .unwrap()
            .with_debug_sink(overlay.clone());

        let mut first = flat(0, vec![car(10, 10, 40, 40)]);
        tracker.update(&mut first, None, true).unwrap();
        let mut second = flat(1, vec![car(11, 10, 40, 40)]);
        tracker.update(&mut second, None, true).unwrap();

        let sink = overlay.lock().unwrap();
        assert_eq!(sink.masks().len(), 1);
        assert_eq!(sink.masks()[0].0, 1);
        let overlays = sink.overlays();
        assert_eq!(overlays.len(), 2);
        assert_eq!(overlays[1].0, 1);
        assert_eq!(*overlays[1].1.get_pixel(11, 10), identity_color(TrackId(1)));
    }

    #[test]
    fn test_take_debug_sink() {
        let mut tracker = FlowTracker::new(TrackerConfig::default())
            .unwrap()
            .with_debug_sink(OverlaySink::default());
        assert!(tracker.debug_sink_mut().is_some());

        assert!(tracker.take_debug_sink().is_some());
        assert!(tracker.take_debug_sink().is_none());

        let mut frame = flat(0, vec![car(10, 10, 40, 40)]);
        tracker.update(&mut frame, None, true).unwrap();
        assert_eq!(ids(&frame), vec![1]);
    }

    #[test]
    fn test_tracker_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<FlowTracker>();
    }
}
