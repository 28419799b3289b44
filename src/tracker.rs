mod appearance_tracker;
mod config;
mod debug;
mod detection;
mod flow_tracker;
mod identity;
mod matching;
mod rect;
mod resolution;

pub use appearance_tracker::AppearanceTracker;
pub use config::TrackerConfig;
pub use debug::{DebugSink, OverlaySink, TracingSink, draw_rect, identity_color};
pub use detection::{Detection, Frame};
pub use flow_tracker::{FlowTracker, project_detections};
pub use identity::{IdAllocator, TrackId};
pub use matching::{
    AssignmentResult, embedding_distance, linear_assignment, match_by_overlap, resolve_by_overlap,
};
pub use rect::{PixelSpan, Rect};
pub use resolution::Resolution;
