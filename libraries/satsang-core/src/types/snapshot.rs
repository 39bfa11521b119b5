/// Queue snapshot shared between the controller and the background service
use crate::types::Track;
use serde::{Deserialize, Serialize};

/// Ordered queue plus the selected index
///
/// `current_index` is always within bounds for a non-empty queue; constructors
/// clamp it. An empty snapshot has index 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    /// Tracks in play order
    pub tracks: Vec<Track>,

    /// Index of the selected track
    pub current_index: usize,
}

impl QueueSnapshot {
    /// Create a snapshot, clamping `current_index` into the queue
    pub fn new(tracks: Vec<Track>, current_index: usize) -> Self {
        let current_index = clamp_index(current_index, tracks.len());
        Self {
            tracks,
            current_index,
        }
    }

    /// Selected track, if any
    pub fn current(&self) -> Option<&Track> {
        self.tracks.get(self.current_index)
    }

    /// Number of tracks
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Copy of this snapshot pointing at `index` (clamped)
    #[must_use]
    pub fn with_index(&self, index: usize) -> Self {
        Self::new(self.tracks.clone(), index)
    }

    /// URLs of every queued track
    pub fn urls(&self) -> Vec<String> {
        self.tracks.iter().map(|t| t.url.clone()).collect()
    }
}

/// Clamp `index` into `[0, len - 1]` (0 for an empty queue)
pub fn clamp_index(index: usize, len: usize) -> usize {
    index.min(len.saturating_sub(1))
}
