//! Playback engine adapter
//!
//! [`PlaybackEngine`] is the seam between the queue controller and whatever
//! actually produces sound: a native background-audio service on mobile, or
//! the in-process [`HeadlessEngine`] used by the CLI host and tests.
//!
//! The adapter provides no implicit queuing. Every mutating call completes
//! before the controller issues the next dependent one (`add` before `skip`,
//! `skip` before `seek_to`).

mod headless;

pub use headless::HeadlessEngine;

use crate::error::Result;
use async_trait::async_trait;
use satsang_core::{Track, TrackId};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::broadcast;

/// Normalized queue entry handed to the engine
///
/// Built from a [`Track`] when a queue is loaded. Every entry carries the
/// `load_id` of the load that enqueued it, so events can be matched against
/// the load the controller currently considers active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineTrack {
    pub id: TrackId,
    pub url: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub genre: String,
    /// Always positive
    pub duration: Duration,
    pub artwork: Option<String>,
    pub load_id: u64,
}

impl EngineTrack {
    /// Normalize a backend track
    ///
    /// Returns `None` for entries without a stream URL.
    pub fn from_track(track: &Track, index: usize, load_id: u64) -> Option<Self> {
        if !track.is_playable() {
            return None;
        }

        Some(Self {
            id: track.effective_id(index),
            url: track.url.clone(),
            title: track.title.clone(),
            artist: track
                .artist
                .clone()
                .unwrap_or_else(|| "Unknown Speaker".to_string()),
            album: track.album.clone().unwrap_or_default(),
            genre: track.genre.clone().unwrap_or_default(),
            duration: track.normalized_duration(),
            artwork: track.artwork.clone(),
            load_id,
        })
    }

    /// Back to a storable track (for snapshots)
    pub fn to_track(&self) -> Track {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Track {
            id: Some(self.id.clone()),
            url: self.url.clone(),
            title: self.title.clone(),
            artist: non_empty(&self.artist),
            album: non_empty(&self.album),
            genre: non_empty(&self.genre),
            duration_secs: Some(self.duration.as_secs_f64()),
            estimated_duration_secs: None,
            artwork: self.artwork.clone(),
        }
    }
}

/// Partial metadata update for the lock screen / notification
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataPatch {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub artwork: Option<String>,
    pub duration: Option<Duration>,
}

impl MetadataPatch {
    /// Patch that only refines the duration
    pub fn duration(duration: Duration) -> Self {
        Self {
            duration: Some(duration),
            ..Self::default()
        }
    }

    /// Apply the patch in place
    pub fn apply(&self, track: &mut EngineTrack) {
        if let Some(title) = &self.title {
            track.title.clone_from(title);
        }
        if let Some(artist) = &self.artist {
            track.artist.clone_from(artist);
        }
        if let Some(album) = &self.album {
            track.album.clone_from(album);
        }
        if let Some(artwork) = &self.artwork {
            track.artwork = Some(artwork.clone());
        }
        if let Some(duration) = self.duration {
            track.duration = duration;
        }
    }
}

impl From<&EngineTrack> for MetadataPatch {
    fn from(track: &EngineTrack) -> Self {
        Self {
            title: Some(track.title.clone()),
            artist: Some(track.artist.clone()),
            album: Some(track.album.clone()),
            artwork: track.artwork.clone(),
            duration: Some(track.duration),
        }
    }
}

/// Engine transport state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EngineState {
    /// Nothing loaded
    None,
    /// Loaded and able to play, but not playing
    Ready,
    Buffering,
    Playing,
    Paused,
    Stopped,
    Error,
}

impl EngineState {
    pub fn is_playing(self) -> bool {
        matches!(self, Self::Playing)
    }
}

/// Events emitted by the engine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// The engine cursor moved
    TrackChanged {
        index: Option<usize>,
        track: Option<EngineTrack>,
    },
    StateChanged(EngineState),
    Error { message: String },
    /// Playback ran past the last entry
    QueueEnded { index: Option<usize> },
}

/// Remote transport capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    Play,
    Pause,
    Stop,
    SkipToNext,
    SkipToPrevious,
    SeekTo,
}

/// Capability registration for the lock screen / notification shade
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    pub full: Vec<Capability>,
    pub compact: Vec<Capability>,
}

impl Capabilities {
    /// Everything the controller can serve
    pub fn standard(compact: Vec<Capability>) -> Self {
        Self {
            full: vec![
                Capability::Play,
                Capability::Pause,
                Capability::SkipToNext,
                Capability::SkipToPrevious,
                Capability::SeekTo,
            ],
            compact,
        }
    }
}

/// Primitive operations of a background-capable audio engine
#[async_trait]
pub trait PlaybackEngine: Send + Sync {
    /// Clear the queue and stop
    async fn reset(&self) -> Result<()>;

    /// Append entries to the queue
    async fn add(&self, tracks: Vec<EngineTrack>) -> Result<()>;

    /// Move the cursor to `index`
    async fn skip(&self, index: usize) -> Result<()>;

    async fn skip_to_next(&self) -> Result<()>;

    async fn skip_to_previous(&self) -> Result<()>;

    async fn play(&self) -> Result<()>;

    async fn pause(&self) -> Result<()>;

    async fn stop(&self) -> Result<()>;

    async fn seek_to(&self, position: Duration) -> Result<()>;

    async fn position(&self) -> Result<Duration>;

    /// Measured duration of the current track, zero when unknown
    async fn duration(&self) -> Result<Duration>;

    async fn current_index(&self) -> Result<Option<usize>>;

    async fn current_track(&self) -> Result<Option<EngineTrack>>;

    async fn track(&self, index: usize) -> Result<Option<EngineTrack>>;

    async fn queue(&self) -> Result<Vec<EngineTrack>>;

    async fn state(&self) -> Result<EngineState>;

    async fn update_metadata_for_track(&self, index: usize, patch: MetadataPatch) -> Result<()>;

    /// Register remote transport capabilities
    async fn update_options(&self, capabilities: Capabilities) -> Result<()>;

    /// Re-request audio focus / reactivate the audio session
    async fn activate_session(&self) -> Result<()>;

    /// Tear the engine down; later calls may fail with `Destroyed`
    async fn destroy(&self) -> Result<()>;

    /// Subscribe to engine events
    fn subscribe(&self) -> broadcast::Receiver<EngineEvent>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_without_url_are_dropped() {
        let track = Track::new("", "No stream");
        assert!(EngineTrack::from_track(&track, 0, 1).is_none());
    }

    #[test]
    fn normalized_entry_has_positive_duration_and_composite_id() {
        let track = Track::new("https://cdn/a.mp3", "A");
        let entry = EngineTrack::from_track(&track, 2, 7).unwrap();

        assert_eq!(entry.id.as_str(), "2-https://cdn/a.mp3");
        assert!(entry.duration > Duration::ZERO);
        assert_eq!(entry.load_id, 7);
        assert_eq!(entry.artist, "Unknown Speaker");
    }

    #[test]
    fn duration_patch_only_touches_duration() {
        let track = Track::new("u", "Title").with_duration_secs(10.0);
        let mut entry = EngineTrack::from_track(&track, 0, 1).unwrap();

        MetadataPatch::duration(Duration::from_secs(600)).apply(&mut entry);

        assert_eq!(entry.duration, Duration::from_secs(600));
        assert_eq!(entry.title, "Title");
    }
}
