mod ids;
mod lifecycle;
mod position;
mod snapshot;
mod track;

pub use ids::TrackId;
pub use lifecycle::AppState;
pub use position::{LastPlayed, PositionRecord, SongRef};
pub use snapshot::{clamp_index, QueueSnapshot};
pub use track::{Track, FALLBACK_DURATION};
