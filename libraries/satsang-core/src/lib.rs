//! Satsang Player Core
//!
//! Platform-agnostic core types, traits, and error handling for Satsang Player.
//!
//! This crate provides the foundational building blocks shared by the playback
//! controller, the background remote-control service, and storage backends.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `Track`, `QueueSnapshot`, `PositionRecord`, `LastPlayed`, `AppState`
//! - **Core Traits**: `KeyValueStore` (durable local storage), `CatalogSource` (content backend)
//! - **Error Handling**: Unified `SatsangError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use satsang_core::types::{QueueSnapshot, Track};
//!
//! let lecture = Track::new("https://cdn.example.org/lectures/gita-01.mp3", "Gita Class 1")
//!     .with_artist("Swami")
//!     .with_duration_secs(3540.0);
//!
//! let snapshot = QueueSnapshot::new(vec![lecture], 0);
//! assert_eq!(snapshot.current().map(|t| t.title.as_str()), Some("Gita Class 1"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod storage;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{Result, SatsangError};
pub use storage::KeyValueStore;
pub use traits::CatalogSource;

pub use types::{
    clamp_index, AppState, LastPlayed, PositionRecord, QueueSnapshot, SongRef, Track, TrackId,
};
