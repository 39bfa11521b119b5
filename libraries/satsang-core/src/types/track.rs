/// Track domain type
use crate::types::TrackId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Duration used when neither a measured nor an estimated duration is known.
///
/// Native engines refuse to enqueue tracks with a zero or missing duration.
pub const FALLBACK_DURATION: Duration = Duration::from_secs(1);

/// Audio track as delivered by the content backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Backend identifier, if the backend supplied one
    #[serde(default)]
    pub id: Option<TrackId>,

    /// Stream URL (required for playback)
    pub url: String,

    /// Track title
    pub title: String,

    /// Speaker / artist name
    #[serde(default)]
    pub artist: Option<String>,

    /// Album or series name
    #[serde(default)]
    pub album: Option<String>,

    /// Genre or category
    #[serde(default)]
    pub genre: Option<String>,

    /// Duration in seconds as reported by the backend
    #[serde(default)]
    pub duration_secs: Option<f64>,

    /// Rough duration estimate (e.g. from file size and bitrate)
    #[serde(default)]
    pub estimated_duration_secs: Option<f64>,

    /// Artwork URL
    #[serde(default)]
    pub artwork: Option<String>,
}

impl Track {
    /// Create a new track with minimal metadata
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: None,
            url: url.into(),
            title: title.into(),
            artist: None,
            album: None,
            genre: None,
            duration_secs: None,
            estimated_duration_secs: None,
            artwork: None,
        }
    }

    /// Set the backend id
    #[must_use]
    pub fn with_id(mut self, id: impl Into<TrackId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the artist
    #[must_use]
    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    /// Set the album
    #[must_use]
    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    /// Set the genre
    #[must_use]
    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = Some(genre.into());
        self
    }

    /// Set the reported duration
    #[must_use]
    pub fn with_duration_secs(mut self, secs: f64) -> Self {
        self.duration_secs = Some(secs);
        self
    }

    /// Set the estimated duration
    #[must_use]
    pub fn with_estimated_duration_secs(mut self, secs: f64) -> Self {
        self.estimated_duration_secs = Some(secs);
        self
    }

    /// Set the artwork URL
    #[must_use]
    pub fn with_artwork(mut self, artwork: impl Into<String>) -> Self {
        self.artwork = Some(artwork.into());
        self
    }

    /// Whether the track can be handed to the engine at all
    pub fn is_playable(&self) -> bool {
        !self.url.trim().is_empty()
    }

    /// Id to enqueue under: the backend id, or a composite of `index` and URL
    pub fn effective_id(&self, index: usize) -> TrackId {
        match &self.id {
            Some(id) if !id.as_str().is_empty() => id.clone(),
            _ => TrackId::composite(index, &self.url),
        }
    }

    /// Positive duration for the engine
    ///
    /// Reported duration, else the estimate, else [`FALLBACK_DURATION`].
    pub fn normalized_duration(&self) -> Duration {
        [self.duration_secs, self.estimated_duration_secs]
            .into_iter()
            .flatten()
            .find(|secs| secs.is_finite() && *secs > 0.0)
            .map_or(FALLBACK_DURATION, Duration::from_secs_f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_duration_prefers_reported_value() {
        let track = Track::new("u", "t")
            .with_duration_secs(120.0)
            .with_estimated_duration_secs(90.0);
        assert_eq!(track.normalized_duration(), Duration::from_secs(120));
    }

    #[test]
    fn normalized_duration_falls_back_to_estimate_then_one_second() {
        let estimated = Track::new("u", "t")
            .with_duration_secs(0.0)
            .with_estimated_duration_secs(90.0);
        assert_eq!(estimated.normalized_duration(), Duration::from_secs(90));

        let unknown = Track::new("u", "t").with_duration_secs(f64::NAN);
        assert_eq!(unknown.normalized_duration(), FALLBACK_DURATION);
    }

    #[test]
    fn effective_id_uses_composite_when_missing() {
        let track = Track::new("https://cdn/a.mp3", "A");
        assert_eq!(track.effective_id(2).as_str(), "2-https://cdn/a.mp3");

        let with_id = track.with_id("lecture-7");
        assert_eq!(with_id.effective_id(2).as_str(), "lecture-7");
    }

    #[test]
    fn blank_url_is_not_playable() {
        assert!(!Track::new("  ", "Broken").is_playable());
        assert!(Track::new("https://cdn/a.mp3", "A").is_playable());
    }

    #[test]
    fn deserializes_with_only_required_fields() {
        let track: Track = serde_json::from_str(r#"{"url":"https://cdn/a.mp3","title":"A"}"#).unwrap();
        assert_eq!(track.id, None);
        assert_eq!(track.normalized_duration(), FALLBACK_DURATION);
    }
}
