/// Persisted playback positions
use serde::{Deserialize, Serialize};

/// Minimal song reference stored alongside a position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongRef {
    /// Track title at the time the position was saved
    pub title: String,
    /// Effective URL (after alias remapping)
    pub url: String,
}

/// Last-heard offset for one track
///
/// A position of 0 means "unplayed / reset".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionRecord {
    /// Song the position belongs to
    pub song: SongRef,
    /// Offset in milliseconds
    pub position: u64,
}

impl PositionRecord {
    /// Create a record
    pub fn new(title: impl Into<String>, url: impl Into<String>, position: u64) -> Self {
        Self {
            song: SongRef {
                title: title.into(),
                url: url.into(),
            },
            position,
        }
    }
}

/// Breadcrumb written when playback is stopped from the lock screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastPlayed {
    /// URL of the track that was playing
    pub url: String,
    /// Offset in milliseconds
    pub position_ms: u64,
}
