//! Storage keys
//!
//! One place for every key the playback core writes, so the in-app controller
//! and the background service cannot drift apart.

/// Queue tracks (JSON array of `Track`)
pub const PLAYLIST: &str = "playback.playlist";

/// Selected queue index (JSON number)
pub const CURRENT_INDEX: &str = "playback.current_index";

/// Position records (JSON array of `PositionRecord`)
pub const POSITIONS: &str = "playback.positions";

/// URL of the track playing when playback was stopped remotely
pub const LAST_SONG_URL: &str = "playback.last_song_url";

/// Offset (ms) of the track playing when playback was stopped remotely
pub const LAST_SONG_POSITION: &str = "playback.last_song_position";

/// Persisted critical diagnostic log entries
pub const DIAGNOSTIC_LOG: &str = "diagnostics.log";
