use crate::tracker::identity::TrackId;

/// Outcome of one identity-resolution stage for a single detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resolution {
    /// Identity taken over from an earlier observation
    Matched(TrackId),
    /// Defer to the next stage
    #[default]
    Unmatched,
}

impl Resolution {
    pub fn id(self) -> Option<TrackId> {
        match self {
            Self::Matched(id) => Some(id),
            Self::Unmatched => None,
        }
    }

    pub fn is_matched(self) -> bool {
        matches!(self, Self::Matched(_))
    }
}

impl From<Option<TrackId>> for Resolution {
    fn from(id: Option<TrackId>) -> Self {
        id.map_or(Self::Unmatched, Self::Matched)
    }
}
