//! Pending playback context
//!
//! One record per in-flight "load queue and start playback" operation. It is
//! diagnostic state, and the `load_id` it carries decides whether a late
//! engine event still belongs to the current load.

use crate::engine::EngineState;
use chrono::{DateTime, Utc};
use satsang_core::{AppState, TrackId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Engine step a load can fail at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadStep {
    Reset,
    Add,
    Skip,
    Seek,
    Play,
}

impl LoadStep {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reset => "reset",
            Self::Add => "add",
            Self::Skip => "skip",
            Self::Seek => "seek",
            Self::Play => "play",
        }
    }
}

/// Load progression
///
/// `InitializingPlayback → TrackSelected → MetadataPrimed → PositionRestored
/// → PlayRequested → PlayResolved → StatePlaying`, or `InitializedNoPlay`
/// after `PositionRestored` when playback was not requested. `Failed` is
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlaybackStage {
    InitializingPlayback,
    TrackSelected,
    MetadataPrimed,
    PositionRestored,
    PlayRequested,
    PlayResolved,
    StatePlaying,
    InitializedNoPlay,
    Failed(LoadStep),
}

impl PlaybackStage {
    fn rank(self) -> u8 {
        match self {
            Self::InitializingPlayback => 0,
            Self::TrackSelected => 1,
            Self::MetadataPrimed => 2,
            Self::PositionRestored => 3,
            Self::PlayRequested => 4,
            Self::PlayResolved => 5,
            Self::StatePlaying | Self::InitializedNoPlay => 6,
            Self::Failed(_) => 7,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::StatePlaying | Self::InitializedNoPlay | Self::Failed(_)
        )
    }

    /// Play was requested and the engine has not confirmed it yet
    pub fn awaits_confirmation(self) -> bool {
        matches!(self, Self::PlayRequested | Self::PlayResolved)
    }
}

impl fmt::Display for PlaybackStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InitializingPlayback => f.write_str("initializing-playback"),
            Self::TrackSelected => f.write_str("track-selected"),
            Self::MetadataPrimed => f.write_str("metadata-primed"),
            Self::PositionRestored => f.write_str("position-restored"),
            Self::PlayRequested => f.write_str("play-requested"),
            Self::PlayResolved => f.write_str("play-resolved"),
            Self::StatePlaying => f.write_str("state-playing"),
            Self::InitializedNoPlay => f.write_str("initialized-no-play"),
            Self::Failed(step) => write!(f, "{}-error", step.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingPlaybackContext {
    pub load_id: u64,
    pub track_id: TrackId,
    pub track_title: String,
    pub stage: PlaybackStage,
    pub requested_at: DateTime<Utc>,
    pub app_state_at_request: AppState,
    pub should_play: bool,
    pub saved_position: Duration,
    pub metadata_primed_at: Option<DateTime<Utc>>,
    pub play_requested_at: Option<DateTime<Utc>>,
    pub play_resolved_at: Option<DateTime<Utc>>,
    pub playback_confirmed_at: Option<DateTime<Utc>>,
    pub last_known_state: Option<EngineState>,
    pub last_state_at: Option<DateTime<Utc>>,
    /// The load watchdog fired before the load finished
    pub timed_out: bool,
}

impl PendingPlaybackContext {
    pub fn new(
        load_id: u64,
        track_id: TrackId,
        track_title: impl Into<String>,
        app_state: AppState,
        should_play: bool,
        saved_position: Duration,
    ) -> Self {
        Self {
            load_id,
            track_id,
            track_title: track_title.into(),
            stage: PlaybackStage::InitializingPlayback,
            requested_at: Utc::now(),
            app_state_at_request: app_state,
            should_play,
            saved_position,
            metadata_primed_at: None,
            play_requested_at: None,
            play_resolved_at: None,
            playback_confirmed_at: None,
            last_known_state: None,
            last_state_at: None,
            timed_out: false,
        }
    }

    /// Move forward to `stage`
    ///
    /// Backward moves and moves out of a terminal stage are ignored and
    /// return `false`.
    pub fn advance(&mut self, stage: PlaybackStage) -> bool {
        if self.stage.is_terminal() || stage.rank() <= self.stage.rank() {
            return false;
        }

        let now = Utc::now();
        match stage {
            PlaybackStage::MetadataPrimed => self.metadata_primed_at = Some(now),
            PlaybackStage::PlayRequested => self.play_requested_at = Some(now),
            PlaybackStage::PlayResolved => self.play_resolved_at = Some(now),
            PlaybackStage::StatePlaying => self.playback_confirmed_at = Some(now),
            _ => {}
        }
        self.stage = stage;
        true
    }

    pub fn record_state(&mut self, state: EngineState) {
        self.last_known_state = Some(state);
        self.last_state_at = Some(Utc::now());
    }
}
