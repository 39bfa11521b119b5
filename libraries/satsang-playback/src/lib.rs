//! Satsang Player Playback
//!
//! Queue control and playback coordination on top of a background-capable
//! audio engine.
//!
//! # Components
//!
//! - [`PlaybackEngine`]: adapter trait over the native engine, plus the
//!   in-process [`HeadlessEngine`]
//! - [`TrackQueueController`]: authoritative queue, loads, navigation, seeking,
//!   position persistence
//! - [`LifecycleCoordinator`]: foreground/background transitions and the
//!   first-load auto-resume watchdog
//! - [`BackgroundService`]: remote transport events and queue auto-continuation,
//!   working from the persisted snapshot
//! - [`NavigationGuard`]: suppression window shared by the controller and the
//!   background service
//!
//! # Example
//!
//! ```rust,no_run
//! use satsang_core::Track;
//! use satsang_playback::{HeadlessEngine, LoadRequest, PlaybackSettings, TrackQueueController};
//! use satsang_storage::MemoryStore;
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let engine = Arc::new(HeadlessEngine::new());
//! let store = Arc::new(MemoryStore::new());
//! let controller = TrackQueueController::new(engine, store, PlaybackSettings::default()).start();
//!
//! let tracks = vec![
//!     Track::new("https://cdn/gita-01.mp3", "Gita Class 1"),
//!     Track::new("https://cdn/gita-02.mp3", "Gita Class 2"),
//! ];
//! let outcome = controller.load_playlist(LoadRequest::new(tracks).start_at(1)).await;
//! assert!(outcome.is_loaded());
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod catalog;
pub mod controller;
pub mod engine;
pub mod error;
pub mod gate;
pub mod guard;
pub mod lifecycle;
pub mod pending;
pub mod persister;
pub mod policy;
pub mod remote;
pub mod settings;

pub use catalog::LibraryCatalog;
pub use controller::{
    LoadOutcome, LoadRejection, LoadRequest, NavigationOutcome, PlayerState, TrackQueueController,
};
pub use engine::{
    Capabilities, Capability, EngineEvent, EngineState, EngineTrack, HeadlessEngine,
    MetadataPatch, PlaybackEngine,
};
pub use error::{PlaybackError, Result};
pub use guard::NavigationGuard;
pub use lifecycle::LifecycleCoordinator;
pub use pending::{LoadStep, PendingPlaybackContext, PlaybackStage};
pub use policy::{Advance, AutoResumePolicy, Direction, QueueAdvancePolicy, SessionFacts};
pub use remote::{BackgroundService, RemoteEvent, RemoteOutcome};
pub use settings::{EndOfQueue, PlaybackSettings};
