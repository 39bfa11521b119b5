//! Track queue controller
//!
//! Owns the authoritative in-memory queue, the current index and the pending
//! playback intent. UI-driven requests (load, play/pause, seek, next/previous)
//! and engine-driven events both land here; results are published as a
//! [`PlayerState`] on a watch channel.
//!
//! Two gates keep requests from interleaving: one admits a single queue load
//! at a time, the other a single next/previous transition. Rejected requests
//! are dropped with a warning, never queued.

mod events;
mod load;
mod transport;

use crate::engine::{EngineTrack, PlaybackEngine};
use crate::gate::{GatePermit, TryGate};
use crate::guard::NavigationGuard;
use crate::pending::{LoadStep, PendingPlaybackContext};
use crate::persister::PositionPersister;
use crate::policy::SessionFacts;
use crate::settings::PlaybackSettings;
use satsang_core::{AppState, CatalogSource, KeyValueStore, QueueSnapshot, Track};
use satsang_storage::positions::PositionStore;
use satsang_storage::snapshot::SnapshotStore;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// What the UI renders
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlayerState {
    pub current_track: Option<EngineTrack>,
    pub current_index: usize,
    pub queue_len: usize,
    pub is_playing: bool,
    pub is_loading: bool,
    /// The last load failed or never got confirmed; offer a retry
    pub load_failed: bool,
    pub position: Duration,
    pub app_state: AppState,
    pub pending: Option<PendingPlaybackContext>,
}

/// Arguments of a queue load
#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    pub tracks: Vec<Track>,
    pub start_index: usize,
    pub saved_position: Duration,
    pub should_play: bool,
}

impl LoadRequest {
    /// Load `tracks` from the first entry, from the start, and play
    pub fn new(tracks: Vec<Track>) -> Self {
        Self {
            tracks,
            start_index: 0,
            saved_position: Duration::ZERO,
            should_play: true,
        }
    }

    #[must_use]
    pub fn start_at(mut self, index: usize) -> Self {
        self.start_index = index;
        self
    }

    #[must_use]
    pub fn resume_from(mut self, position: Duration) -> Self {
        self.saved_position = position;
        self
    }

    #[must_use]
    pub fn with_play(mut self, should_play: bool) -> Self {
        self.should_play = should_play;
        self
    }

    #[must_use]
    pub fn paused(self) -> Self {
        self.with_play(false)
    }
}

/// Why a load was not attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadRejection {
    EmptyPlaylist,
    NoPlayableTracks,
    /// Another load is in flight
    Busy,
    ShutDown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Loaded {
        load_id: u64,
        index: usize,
        /// The engine reported `Playing` by the end of the load
        playing: bool,
    },
    Rejected(LoadRejection),
    Failed {
        load_id: u64,
        step: LoadStep,
        message: String,
    },
    /// The watchdog gave up on this load and a newer request took over
    Superseded { load_id: u64 },
}

impl LoadOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NavigationOutcome {
    Moved { index: usize },
    /// Past the end of the queue; a catalog track was loaded instead
    CatalogFallback(LoadOutcome),
    NoOp,
    /// Another transition is in flight
    Rejected,
    Failed { message: String },
}

pub struct TrackQueueController {
    engine: Arc<dyn PlaybackEngine>,
    snapshots: SnapshotStore,
    positions: Arc<PositionStore>,
    catalog: Option<Arc<dyn CatalogSource>>,
    guard: Arc<NavigationGuard>,
    settings: PlaybackSettings,
    load_gate: TryGate,
    transition_gate: TryGate,
    load_ids: AtomicU64,
    shared: Arc<Shared>,
    persister: Mutex<PositionPersister>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    load_watchdog: Mutex<Option<JoinHandle<()>>>,
    shut_down: AtomicBool,
}

/// State reachable from spawned tasks
struct Shared {
    session: Mutex<Session>,
    state_tx: watch::Sender<PlayerState>,
}

#[derive(Default)]
struct Session {
    /// Playable source tracks, parallel to `entries`
    tracks: Vec<Track>,
    entries: Vec<EngineTrack>,
    current_index: usize,
    active_load_id: Option<u64>,
    /// The load allowed to issue engine calls
    driving_load: Option<u64>,
    pending: Option<PendingPlaybackContext>,
    is_playing: bool,
    is_loading: bool,
    load_failed: bool,
    position: Duration,
    app_state: AppState,
    last_request: Option<LoadRequest>,
    loads_completed: u64,
    play_requested: bool,
    user_paused: bool,
    consecutive_errors: u32,
    played_urls: Vec<String>,
}

impl Session {
    fn current_track(&self) -> Option<EngineTrack> {
        self.entries.get(self.current_index).cloned()
    }

    fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot::new(self.tracks.clone(), self.current_index)
    }

    fn is_driving(&self, load_id: u64) -> bool {
        self.driving_load == Some(load_id)
    }

    fn mark_played(&mut self, url: &str) {
        if !self.played_urls.iter().any(|u| u == url) {
            self.played_urls.push(url.to_string());
        }
    }

    fn player_state(&self) -> PlayerState {
        PlayerState {
            current_track: self.current_track(),
            current_index: self.current_index,
            queue_len: self.entries.len(),
            is_playing: self.is_playing,
            is_loading: self.is_loading,
            load_failed: self.load_failed,
            position: self.position,
            app_state: self.app_state,
            pending: self.pending.clone(),
        }
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read<R>(&self, f: impl FnOnce(&Session) -> R) -> R {
        f(&self.lock())
    }

    /// Mutate the session and publish the resulting state
    fn update<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        let mut session = self.lock();
        let result = f(&mut session);
        self.state_tx.send_replace(session.player_state());
        result
    }
}

impl TrackQueueController {
    pub fn new(
        engine: Arc<dyn PlaybackEngine>,
        store: Arc<dyn KeyValueStore>,
        settings: PlaybackSettings,
    ) -> Self {
        let (state_tx, _) = watch::channel(PlayerState::default());
        Self {
            snapshots: SnapshotStore::new(Arc::clone(&store)),
            positions: Arc::new(PositionStore::new(store)),
            catalog: None,
            guard: Arc::new(NavigationGuard::new(settings.manual_navigation_window())),
            persister: Mutex::new(PositionPersister::new(
                settings.position_throttle(),
                settings.position_min_write_interval(),
            )),
            load_gate: TryGate::new("track-load"),
            transition_gate: TryGate::new("transition"),
            load_ids: AtomicU64::new(0),
            shared: Arc::new(Shared {
                session: Mutex::new(Session::default()),
                state_tx,
            }),
            tasks: Mutex::new(Vec::new()),
            load_watchdog: Mutex::new(None),
            shut_down: AtomicBool::new(false),
            engine,
            settings,
        }
    }

    /// Source of fallback tracks past the end of the queue
    #[must_use]
    pub fn with_catalog(mut self, catalog: Arc<dyn CatalogSource>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Share a suppression window with the background service
    #[must_use]
    pub fn with_navigation_guard(mut self, guard: Arc<NavigationGuard>) -> Self {
        self.guard = guard;
        self
    }

    /// Use a position store with URL aliases
    #[must_use]
    pub fn with_positions(mut self, positions: Arc<PositionStore>) -> Self {
        self.positions = positions;
        self
    }

    /// Subscribe to engine events and start the progress ticker
    ///
    /// Both tasks hold a weak reference and stop once the controller is
    /// dropped or cleaned up.
    pub fn start(self) -> Arc<Self> {
        let controller = Arc::new(self);
        let listener = controller.spawn_event_listener();
        let ticker = controller.spawn_progress_ticker();
        controller.lock_tasks().extend([listener, ticker]);
        controller
    }

    /// Current player state
    pub fn state(&self) -> PlayerState {
        self.shared.state_tx.borrow().clone()
    }

    /// Receive every published player state
    pub fn subscribe(&self) -> watch::Receiver<PlayerState> {
        self.shared.state_tx.subscribe()
    }

    pub fn settings(&self) -> &PlaybackSettings {
        &self.settings
    }

    pub fn navigation_guard(&self) -> Arc<NavigationGuard> {
        Arc::clone(&self.guard)
    }

    pub fn positions(&self) -> Arc<PositionStore> {
        Arc::clone(&self.positions)
    }

    /// Queue as currently loaded
    pub fn queue(&self) -> Vec<EngineTrack> {
        self.shared.read(|s| s.entries.clone())
    }

    /// Record the host's lifecycle state
    pub fn note_app_state(&self, app_state: AppState) {
        self.shared.update(|s| s.app_state = app_state);
    }

    /// Inputs for the first-load auto-resume heuristic
    pub fn session_facts(&self) -> SessionFacts {
        self.shared.read(|s| SessionFacts {
            loads_completed: s.loads_completed,
            play_requested: s.play_requested,
            user_paused: s.user_paused,
            is_loading: s.is_loading,
            has_track: s.current_track().is_some(),
        })
    }

    /// Re-register remote transport capabilities with the engine
    pub async fn reassert_capabilities(&self) {
        if let Err(e) = self.engine.update_options(self.settings.capabilities()).await {
            warn!(error = %e, "failed to register remote capabilities");
        }
    }

    /// Claim the load gate from a load the watchdog gave up on
    ///
    /// Returns `None` while the gate holder is still within its timeout.
    fn take_over_timed_out_load(&self) -> Option<GatePermit<'_>> {
        let abandoned = self.shared.update(|s| {
            let load_id = s.driving_load?;
            let timed_out = s
                .pending
                .as_ref()
                .is_some_and(|p| p.load_id == load_id && p.timed_out);
            if !timed_out {
                return None;
            }
            s.driving_load = None;
            Some(load_id)
        })?;
        warn!(load_id = abandoned, "superseding timed-out queue load");
        Some(self.load_gate.take_over())
    }

    fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    fn lock_tasks(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn spawn_event_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let mut events = self.engine.subscribe();
        let controller = Arc::downgrade(self);
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        let Some(controller) = controller.upgrade() else {
                            break;
                        };
                        controller.handle_engine_event(event).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "engine event stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            debug!("engine event listener stopped");
        })
    }

    fn spawn_progress_ticker(self: &Arc<Self>) -> JoinHandle<()> {
        let period = self.settings.position_throttle();
        let controller = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let Some(controller) = controller.upgrade() else {
                    break;
                };
                controller.sample_progress().await;
            }
        })
    }
}

impl Drop for TrackQueueController {
    fn drop(&mut self) {
        for task in self.lock_tasks().drain(..) {
            task.abort();
        }
        if let Some(watchdog) = self
            .load_watchdog
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            watchdog.abort();
        }
    }
}
